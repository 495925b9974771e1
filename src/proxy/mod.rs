//! Proxy probing module
//!
//! This module provides functionality for:
//! - Parsing batch items into probe targets (`host:port` strings or
//!   structured specs with fallback hints)
//! - Geo attribution with cache-through lookups against an external service
//! - Raw TCP reachability probing with bounded timeouts
//! - Fanning batches out to concurrent per-endpoint pipelines
//! - Maintaining the rolling alive/dead summary as records are overwritten

pub mod checker;
pub mod geo;
pub mod models;
pub mod parser;
pub mod prober;
pub mod sink;
pub mod summary;

pub use checker::{CheckerConfig, ProbeOrchestrator};
pub use geo::GeoResolver;
pub use models::{BatchOutcome, Endpoint, EndpointSpec, GeoInfo, ProbeRecord, ProbeStatus};
pub use parser::EndpointParser;
pub use prober::{probe, ProbeOutcome, DEFAULT_PROBE_TIMEOUT_MS};
pub use sink::ResultSink;
pub use summary::{apply_delta, load_summary, CountryTally, Summary, SUMMARY_KEY};
