//! Infrastructure services

mod cache_engine;

pub use cache_engine::{CacheEngine, ImportSummary};
