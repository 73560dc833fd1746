// src/services.rs

pub mod auth;
pub mod document_service;
pub mod lifecycle_service;
pub mod lookup_service;
pub mod outbound_service;
pub mod photo_service;
pub mod sync_service;
