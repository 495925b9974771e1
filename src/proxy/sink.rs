//! Result sink: routes batch output into the shared store or a remote
//! collector
//!
//! Direct persistence is the primary path: each record lands under its
//! proxy key and the rolling summary is adjusted once per write. The
//! remote collector is the fallback transport for deployments without a
//! reachable store; delivery there is at-most-once.

use crate::proxy::models::{BatchOutcome, ProbeRecord};
use crate::proxy::summary;
use crate::store::CacheStore;
use crate::Result;
use anyhow::bail;
use log::warn;
use reqwest::Client;
use std::sync::Arc;

/// Key prefix for stored probe records
const RECORD_KEY_PREFIX: &str = "proxy:";

/// Where batch results go
pub enum ResultSink {
    /// Write records into the shared store, maintaining the summary
    Direct { store: Arc<dyn CacheStore> },
    /// POST records to a remote collector
    Remote { client: Client, url: String },
}

impl ResultSink {
    pub fn direct(store: Arc<dyn CacheStore>) -> Self {
        Self::Direct { store }
    }

    pub fn remote(url: String) -> Self {
        Self::Remote {
            client: Client::new(),
            url,
        }
    }

    /// Persist a batch of outcomes. Error slots are skipped; only records
    /// are persisted.
    ///
    /// On the direct path, per-record store failures are logged and
    /// swallowed. On the remote path, a failed POST is a batch-level
    /// error surfaced to the caller.
    pub async fn persist(&self, outcomes: &[BatchOutcome]) -> Result<()> {
        let records: Vec<&ProbeRecord> =
            outcomes.iter().filter_map(BatchOutcome::as_record).collect();

        match self {
            ResultSink::Direct { store } => {
                for record in records {
                    store_record(store.as_ref(), record).await;
                }
                Ok(())
            }
            ResultSink::Remote { client, url } => {
                let body = serde_json::json!({ "results": records });
                let response = client.post(url).json(&body).send().await?;
                if !response.status().is_success() {
                    bail!("collector at {} rejected results: {}", url, response.status());
                }
                Ok(())
            }
        }
    }
}

/// Write one record under its proxy key and apply the summary delta once,
/// using the value being overwritten as the previous contribution.
async fn store_record(store: &dyn CacheStore, record: &ProbeRecord) {
    let key = format!("{}{}", RECORD_KEY_PREFIX, record.proxy);

    let previous: Option<ProbeRecord> = match store.get(&key).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("previous record read failed for {}: {}", key, e);
            None
        }
    };

    let raw = match serde_json::to_string(record) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("record for {} not serializable: {}", record.proxy, e);
            return;
        }
    };
    if let Err(e) = store.put(&key, &raw, None).await {
        // Record did not land; leave the summary alone.
        warn!("record write failed for {}: {}", key, e);
        return;
    }

    summary::apply_delta(store, previous.as_ref(), record).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProbeStatus;
    use crate::proxy::summary::{load_summary, CountryTally};
    use crate::store::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn record(proxy: &str, status: ProbeStatus, country: Option<&str>) -> ProbeRecord {
        ProbeRecord {
            proxy: proxy.to_string(),
            status,
            latency: match status {
                ProbeStatus::Alive => Some(42),
                ProbeStatus::Dead => None,
            },
            country: country.map(str::to_string),
            isp: None,
            last_checked: 1_700_000_000_000,
        }
    }

    async fn spawn_collector(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_direct_sink_stores_records_and_summary() {
        let store = Arc::new(MemoryStore::new());
        let sink = ResultSink::direct(store.clone());

        let outcomes = vec![
            BatchOutcome::Record(record("1.2.3.4:8080", ProbeStatus::Alive, Some("US"))),
            BatchOutcome::Error {
                error: "invalid endpoint: garbage".to_string(),
            },
            BatchOutcome::Record(record("5.6.7.8:3128", ProbeStatus::Dead, Some("US"))),
        ];
        sink.persist(&outcomes).await.unwrap();

        let stored = store.get("proxy:1.2.3.4:8080").await.unwrap().unwrap();
        let stored: ProbeRecord = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.status, ProbeStatus::Alive);

        let summary = load_summary(store.as_ref()).await.unwrap();
        assert_eq!(summary.alive, 1);
        assert_eq!(summary.dead, 1);
        assert_eq!(summary.countries["US"], CountryTally { alive: 1, dead: 1 });
    }

    #[tokio::test]
    async fn test_direct_sink_overwrite_uses_previous_contribution() {
        let store = Arc::new(MemoryStore::new());
        let sink = ResultSink::direct(store.clone());

        let alive = record("1.2.3.4:8080", ProbeStatus::Alive, Some("US"));
        sink.persist(&[BatchOutcome::Record(alive)]).await.unwrap();

        let dead = record("1.2.3.4:8080", ProbeStatus::Dead, Some("US"));
        sink.persist(&[BatchOutcome::Record(dead)]).await.unwrap();

        let summary = load_summary(store.as_ref()).await.unwrap();
        assert_eq!(summary.alive, 0);
        assert_eq!(summary.dead, 1);
        assert_eq!(summary.countries["US"], CountryTally { alive: 0, dead: 1 });
    }

    #[tokio::test]
    async fn test_remote_sink_posts_results() {
        let url = spawn_collector("200 OK").await;
        let sink = ResultSink::remote(url);

        let outcomes = vec![BatchOutcome::Record(record(
            "1.2.3.4:8080",
            ProbeStatus::Alive,
            Some("US"),
        ))];
        sink.persist(&outcomes).await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_sink_rejection_is_an_error() {
        let url = spawn_collector("500 Internal Server Error").await;
        let sink = ResultSink::remote(url);

        let outcomes = vec![BatchOutcome::Record(record(
            "1.2.3.4:8080",
            ProbeStatus::Dead,
            None,
        ))];
        assert!(sink.persist(&outcomes).await.is_err());
    }

    #[tokio::test]
    async fn test_remote_sink_unreachable_is_an_error() {
        let sink = ResultSink::remote("http://127.0.0.1:1/results".to_string());
        let outcomes = vec![BatchOutcome::Record(record(
            "1.2.3.4:8080",
            ProbeStatus::Dead,
            None,
        ))];
        assert!(sink.persist(&outcomes).await.is_err());
    }
}
