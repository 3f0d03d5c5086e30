//! Command implementations.

pub mod employees;
pub mod events;
pub mod export;
pub mod ingest;
pub mod stats;
pub mod summary;
