//! Incremental summary aggregation over stored probe records
//!
//! The summary is a single shared value under a reserved cache key. Every
//! record write adjusts it by removing the overwritten record's contribution
//! and adding the new one's, instead of recomputing from all records. The
//! read-modify-write cycle is not guarded by the store; concurrent writers
//! can lose updates, which is tolerated as approximate counting.

use crate::proxy::models::{ProbeRecord, ProbeStatus};
use crate::store::CacheStore;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved cache key for the rolling summary. Proxy record keys always
/// embed a `host:port` pair, so this cannot collide with them.
pub const SUMMARY_KEY: &str = "proxy:summary";

/// Alive/dead tally for one country
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryTally {
    pub alive: u64,
    pub dead: u64,
}

/// Rolling aggregate of probe outcomes, globally and per country.
///
/// `total` is carried through untouched: this module never increments it,
/// matching the storage layout where external administration owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub alive: u64,
    #[serde(default)]
    pub dead: u64,
    #[serde(default)]
    pub countries: HashMap<String, CountryTally>,
}

impl Summary {
    /// Remove a record's contribution, flooring every counter at zero
    fn remove(&mut self, record: &ProbeRecord) {
        match record.status {
            ProbeStatus::Alive => self.alive = self.alive.saturating_sub(1),
            ProbeStatus::Dead => self.dead = self.dead.saturating_sub(1),
        }
        if let Some(country) = &record.country {
            if let Some(tally) = self.countries.get_mut(country) {
                match record.status {
                    ProbeStatus::Alive => tally.alive = tally.alive.saturating_sub(1),
                    ProbeStatus::Dead => tally.dead = tally.dead.saturating_sub(1),
                }
            }
        }
    }

    /// Add a record's contribution, creating country entries as needed
    fn add(&mut self, record: &ProbeRecord) {
        match record.status {
            ProbeStatus::Alive => self.alive += 1,
            ProbeStatus::Dead => self.dead += 1,
        }
        if let Some(country) = &record.country {
            let tally = self.countries.entry(country.clone()).or_default();
            match record.status {
                ProbeStatus::Alive => tally.alive += 1,
                ProbeStatus::Dead => tally.dead += 1,
            }
        }
    }
}

/// Load the stored summary. A missing entry yields a fresh default (the
/// summary is created lazily on first write); an unparsable one is reset
/// rather than surfaced.
pub async fn load_summary(store: &dyn CacheStore) -> crate::Result<Summary> {
    let Some(raw) = store.get(SUMMARY_KEY).await? else {
        return Ok(Summary::default());
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("stored summary unparsable, resetting: {}", e);
        Summary::default()
    }))
}

/// Adjust the stored summary for one record write: remove the previous
/// record's contribution (if any), add the current record's.
///
/// Must be invoked exactly once per record write, with the value being
/// overwritten as `previous`, to avoid double counting. Store failures are
/// logged and swallowed; `None` means the update was not applied.
pub async fn apply_delta(
    store: &dyn CacheStore,
    previous: Option<&ProbeRecord>,
    current: &ProbeRecord,
) -> Option<Summary> {
    let mut summary = match load_summary(store).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("summary read failed, skipping update: {}", e);
            return None;
        }
    };

    if let Some(previous) = previous {
        summary.remove(previous);
    }
    summary.add(current);

    let raw = match serde_json::to_string(&summary) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("summary not serializable: {}", e);
            return None;
        }
    };
    if let Err(e) = store.put(SUMMARY_KEY, &raw, None).await {
        warn!("summary write failed: {}", e);
        return None;
    }
    Some(summary)
}
