//! Proxy Probe - batch liveness checking with geo enrichment
//!
//! Probes batches of proxy endpoints over raw TCP, attributes each to a
//! country/ISP via a cached geolocation lookup, and keeps a rolling
//! alive/dead summary consistent as individual records are overwritten.

pub mod proxy;
pub mod store;

pub use proxy::*;
pub use store::{CacheStore, MemoryStore, SqliteStore};

/// Application result type
pub type Result<T> = anyhow::Result<T>;
