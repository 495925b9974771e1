//! Geo resolver module: country/ISP attribution with cache-through lookups
//!
//! Resolution order is cache entry under the endpoint key, then cache entry
//! under the bare IP, then one call to the external geolocation service.
//! Every failure mode degrades to "no geo info" instead of erroring; the
//! surrounding probe always proceeds.

use crate::proxy::models::GeoInfo;
use crate::store::CacheStore;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Expiry for cached geo entries
pub const GEO_TTL_SECS: u64 = 24 * 60 * 60;

/// Default external geolocation service
const DEFAULT_GEO_API_URL: &str = "http://ip-api.com/json";

/// Response shape of the external geolocation service
#[derive(Debug, Deserialize)]
struct GeoApiResponse {
    status: Option<String>,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    asn: Option<String>,
    city: Option<String>,
}

/// Geo resolver backed by the shared cache and an external lookup service
#[derive(Clone)]
pub struct GeoResolver {
    store: Arc<dyn CacheStore>,
    client: Client,
    api_url: String,
}

impl GeoResolver {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            client: Client::new(),
            api_url: DEFAULT_GEO_API_URL.to_string(),
        }
    }

    /// Override the geolocation service base URL
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Resolve geo metadata for `ip`, checking the cache under
    /// `endpoint_key` and the bare IP before calling out.
    ///
    /// Returns `None` when nothing could be resolved; never errors.
    pub async fn resolve(&self, ip: &str, endpoint_key: &str) -> Option<GeoInfo> {
        for key in [format!("geo:{endpoint_key}"), format!("geo:{ip}")] {
            if let Some(info) = self.cached(&key).await {
                return Some(info);
            }
        }

        let info = self.lookup(ip).await?;
        self.cache(endpoint_key, ip, &info).await;
        Some(info)
    }

    /// Fetch a cached entry; a parse failure is treated as a miss
    async fn cached(&self, key: &str) -> Option<GeoInfo> {
        match self.store.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                debug!("geo cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Single external lookup; only an explicit success status is trusted
    async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        let url = format!("{}/{}", self.api_url, ip);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("geo lookup for {} failed: {}", ip, e);
                return None;
            }
        };

        let body: GeoApiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                debug!("geo lookup for {} returned malformed body: {}", ip, e);
                return None;
            }
        };

        if body.status.as_deref() != Some("success") {
            debug!(
                "geo lookup for {} not successful: {:?}",
                ip,
                body.status.as_deref().unwrap_or("<none>")
            );
            return None;
        }

        Some(GeoInfo {
            country: normalize_country(body.country_code, body.country),
            isp: body.isp.or(body.org),
            asn: body.asn,
            city: body.city,
        })
    }

    /// Best-effort write-back under both keys; failures are swallowed
    async fn cache(&self, endpoint_key: &str, ip: &str, info: &GeoInfo) {
        let raw = match serde_json::to_string(info) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("geo entry for {} not serializable: {}", ip, e);
                return;
            }
        };
        let ttl = Some(Duration::from_secs(GEO_TTL_SECS));
        for key in [format!("geo:{endpoint_key}"), format!("geo:{ip}")] {
            if let Err(e) = self.store.put(&key, &raw, ttl).await {
                warn!("geo cache write failed for {}: {}", key, e);
            }
        }
    }
}

/// Normalize to an uppercase 2-letter country code. Prefers the explicit
/// code field; else takes the first two characters of the country name,
/// a lossy heuristic accepted by design.
fn normalize_country(code: Option<String>, name: Option<String>) -> Option<String> {
    if let Some(code) = code.filter(|c| !c.trim().is_empty()) {
        return Some(code.trim().to_uppercase());
    }
    let name = name?;
    let prefix: String = name.trim().chars().take(2).collect();
    if prefix.len() < 2 {
        return None;
    }
    Some(prefix.to_uppercase())
}
