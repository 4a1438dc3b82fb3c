// Core modules
pub mod config;
pub mod core;
pub mod curve;

// Data ingestion modules
pub mod ingest;
pub mod pipeline;
pub mod pricing;
pub mod store;

// HTTP surface
pub mod api;

// Re-export commonly used types for convenience
pub use crate::core::types::*;
pub use store::TokenStore;
