pub mod aggregate;
pub mod api;
pub mod assessment;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod ingest;
pub mod pipeline;
pub mod scoring;
pub mod session;
