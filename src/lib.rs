//! Mosaic: bag-of-visual-words image retrieval engine.

pub mod cluster;
pub mod config;
pub mod distance;
pub mod error;
pub mod features;
pub mod index;
pub mod ingest;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod types;
pub mod vocabulary;
