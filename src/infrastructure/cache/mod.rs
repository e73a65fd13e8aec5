//! Cache infrastructure - bounded stores and request coalescing

mod coalescer;
mod embedding_cache;
mod lru;
mod response_store;

pub use coalescer::RequestCoalescer;
pub use embedding_cache::EmbeddingCache;
pub use response_store::ResponseStore;
