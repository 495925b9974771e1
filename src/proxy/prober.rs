//! Reachability prober: raw TCP connect with a bounded timeout

use crate::proxy::models::ProbeStatus;
use log::debug;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Default bound for a single connect attempt in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Result of a single reachability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub latency: Option<u64>,
}

impl ProbeOutcome {
    fn alive(latency: u64) -> Self {
        Self {
            status: ProbeStatus::Alive,
            latency: Some(latency),
        }
    }

    fn dead() -> Self {
        Self {
            status: ProbeStatus::Dead,
            latency: None,
        }
    }
}

/// Attempt a raw TCP connection to `(host, port)` within `timeout`.
///
/// Latency is wall-clock time to connection establishment; the connection
/// is dropped immediately after. Every failure mode (refused, timeout,
/// resolve failure) collapses to `Dead` with no latency; nothing
/// propagates past this boundary. The timeout covers the whole attempt,
/// name resolution included.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> ProbeOutcome {
    let addr = format!("{}:{}", host, port);
    let start = Instant::now();

    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => {
            let latency = start.elapsed().as_millis() as u64;
            // Close errors are irrelevant once the connection was established.
            drop(stream);
            ProbeOutcome::alive(latency)
        }
        Ok(Err(e)) => {
            debug!("probe {} failed: {}", addr, e);
            ProbeOutcome::dead()
        }
        Err(_) => {
            debug!("probe {} timed out after {:?}", addr, timeout);
            ProbeOutcome::dead()
        }
    }
}
