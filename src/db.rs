// src/db.rs

pub mod store;
pub use store::{Store, StoreTx};
pub mod pg_store;
pub use pg_store::PgStore;
pub mod memory_store;
pub use memory_store::MemoryStore;
