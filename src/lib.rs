pub mod analysis;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod model;
pub mod output;
