pub mod batcher;
pub mod csv_input;
pub mod normalizer;
pub mod timestamp;
pub mod types;
