// src/handlers.rs

pub mod inbounds;
pub mod outbounds;
pub mod sync;
