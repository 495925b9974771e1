//! Probe orchestrator: fans a batch out to concurrent per-endpoint pipelines

use crate::proxy::geo::GeoResolver;
use crate::proxy::models::{BatchOutcome, Endpoint, EndpointSpec, ProbeRecord};
use crate::proxy::parser::EndpointParser;
use crate::proxy::prober::{self, DEFAULT_PROBE_TIMEOUT_MS};
use chrono::Utc;
use futures::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrent endpoint pipelines
const DEFAULT_CONCURRENCY: usize = 10;

/// Configuration for the probe orchestrator
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Bound for each endpoint's TCP connect attempt
    pub timeout: Duration,
    /// Number of endpoint pipelines running at once
    pub concurrency: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Orchestrates geo resolution and reachability probing for batches of
/// endpoints. One output per input, in input order; an individual item's
/// failure never disturbs its siblings.
#[derive(Clone)]
pub struct ProbeOrchestrator {
    config: CheckerConfig,
    geo: GeoResolver,
}

/// One launched (or stillborn) per-item pipeline, kept in input order
enum Slot {
    Task(JoinHandle<ProbeRecord>),
    Invalid(String),
}

impl ProbeOrchestrator {
    pub fn new(geo: GeoResolver) -> Self {
        Self {
            config: CheckerConfig::default(),
            geo,
        }
    }

    pub fn with_config(geo: GeoResolver, config: CheckerConfig) -> Self {
        Self { config, geo }
    }

    /// Probe a single endpoint and assemble its record.
    ///
    /// Geo resolution and the TCP probe run concurrently; a geo failure
    /// never prevents the probe from running.
    pub async fn check_endpoint(&self, endpoint: &Endpoint) -> ProbeRecord {
        let key = endpoint.key();
        let (geo, outcome) = tokio::join!(
            self.geo.resolve(&endpoint.host, &key),
            prober::probe(&endpoint.host, endpoint.port, self.config.timeout),
        );
        let geo = geo.unwrap_or_default();

        let country = geo
            .country
            .or_else(|| endpoint.country_hint.clone())
            .map(|c| c.to_uppercase());
        let isp = geo.isp.or_else(|| endpoint.isp_hint.clone());

        ProbeRecord {
            proxy: key,
            status: outcome.status,
            latency: outcome.latency,
            country,
            isp,
            last_checked: Utc::now().timestamp_millis(),
        }
    }

    /// Probe a whole batch: all pipelines are launched concurrently (bounded
    /// by the configured concurrency) and every one runs to a terminal
    /// state. Output order matches input order regardless of completion
    /// order, and a panicking or unparsable item becomes an error
    /// descriptor in its own slot.
    pub async fn check_batch(&self, items: &[EndpointSpec]) -> Vec<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let slots: Vec<Slot> = items
            .iter()
            .map(|spec| match EndpointParser::parse_spec(spec) {
                Some(endpoint) => {
                    let orchestrator = self.clone();
                    let semaphore = Arc::clone(&semaphore);
                    Slot::Task(tokio::spawn(async move {
                        // The semaphore lives as long as every task holding
                        // a clone of the Arc, so acquire cannot observe it
                        // closed.
                        let _permit = semaphore
                            .acquire()
                            .await
                            .expect("semaphore closed unexpectedly");
                        orchestrator.check_endpoint(&endpoint).await
                    }))
                }
                None => Slot::Invalid(format!("invalid endpoint: {}", describe(spec))),
            })
            .collect();

        // join_all preserves slot order, so output order matches input
        // order no matter when individual pipelines complete.
        future::join_all(slots.into_iter().map(|slot| async move {
            match slot {
                Slot::Task(handle) => match handle.await {
                    Ok(record) => BatchOutcome::Record(record),
                    Err(e) => BatchOutcome::Error {
                        error: format!("probe pipeline failed: {}", e),
                    },
                },
                Slot::Invalid(error) => BatchOutcome::Error { error },
            }
        }))
        .await
    }
}

fn describe(spec: &EndpointSpec) -> String {
    match spec {
        EndpointSpec::Addr(addr) => addr.clone(),
        EndpointSpec::Detailed { ip, port, .. } => format!("{}:{}", ip, port),
    }
}
