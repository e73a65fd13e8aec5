//! Application state shared by the HTTP handlers

use std::sync::Arc;
use std::time::Instant;

use crate::infrastructure::services::CacheEngine;

#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            started_at: Instant::now(),
        }
    }
}
