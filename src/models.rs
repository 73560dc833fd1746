// src/models.rs

pub mod auth;
pub mod bundle;
pub mod inbound;
pub mod lookup;
pub mod lot;
pub mod outbound;
pub mod report;
pub mod sync;
pub mod task;
