//! Data models for probe input, output and geo metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// A batch input item: either a pre-formatted `"host:port"` string or a
/// structured spec carrying optional country/ISP hints. Hints are only used
/// as fallback when geolocation fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointSpec {
    Addr(String),
    Detailed {
        ip: String,
        port: u16,
        #[serde(default)]
        country: Option<String>,
        #[serde(default)]
        isp: Option<String>,
    },
}

/// A parsed proxy endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub country_hint: Option<String>,
    pub isp_hint: Option<String>,
}

impl Endpoint {
    /// Create a new endpoint without hint fields
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            country_hint: None,
            isp_hint: None,
        }
    }

    /// Canonical cache key in `host:port` form
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Liveness verdict for a probed endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Alive,
    Dead,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Alive => write!(f, "alive"),
            ProbeStatus::Dead => write!(f, "dead"),
        }
    }
}

/// Geographic and ISP metadata for an IP address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GeoInfo {
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "DE")
    pub country: Option<String>,
    pub isp: Option<String>,
    pub asn: Option<String>,
    pub city: Option<String>,
}

/// The unit of output and of storage: one record per endpoint key,
/// last write wins.
///
/// Invariants: `status == Alive` iff `latency` is set; `country`, when
/// present, is an uppercase code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub proxy: String,
    pub status: ProbeStatus,
    pub latency: Option<u64>,
    pub country: Option<String>,
    pub isp: Option<String>,
    pub last_checked: i64,
}

impl ProbeRecord {
    pub fn is_alive(&self) -> bool {
        self.status == ProbeStatus::Alive
    }
}

/// Per-item batch output slot: a full record, or an error descriptor when
/// that item's pipeline failed without producing one.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Record(ProbeRecord),
    Error { error: String },
}

impl BatchOutcome {
    pub fn as_record(&self) -> Option<&ProbeRecord> {
        match self {
            BatchOutcome::Record(record) => Some(record),
            BatchOutcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BatchOutcome::Error { .. })
    }
}
