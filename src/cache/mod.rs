//! Bounded handle cache.
//!
//! A fixed-capacity least-recently-used map with an eviction disposer,
//! used to bound the memory held by live renderer adapters.

mod lru;

pub use lru::LruCache;
