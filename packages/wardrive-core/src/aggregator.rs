//! Session aggregation: one canonical record per BSSID plus the movement history.
//!
//! The [`Aggregator`] is the only way to mutate session state. It is owned by a
//! single task (see [`crate::session::Wardriver`]) so none of this needs locks.
//!
//! Merge policy: the strongest observation of a BSSID wins. A stronger signal
//! replaces every field except `first_seen_at`, including the position, so a
//! record's location is where it was heard best rather than where it was heard
//! last. `last_seen_at` always advances.

use crate::radio::oui::{canonical_bssid, lookup_vendor};
use crate::radio::{RawAccessPoint, Security, frequency_to_channel, security};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// A geographic fix without a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

/// One entry of the movement history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            timestamp,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_meters: self.accuracy_meters,
        }
    }
}

/// Canonical per-network record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub bssid: String,
    pub ssid: String,
    pub signal_strength: i32,
    pub frequency_mhz: Option<u32>,
    /// `0` when the frequency is outside every known band
    pub channel: u32,
    pub security: Security,
    pub interface_name: String,
    pub vendor: Option<String>,
    /// When the observation backing the stored fields was made
    pub observed_at: DateTime<Utc>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub position: Option<Position>,
}

impl NetworkRecord {
    /// Build a merge candidate from a raw backend observation.
    pub fn from_access_point(ap: &RawAccessPoint, interface_name: &str, now: DateTime<Utc>) -> Self {
        let bssid = canonical_bssid(&ap.bssid);
        let ssid = ap
            .ssid
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| hidden_ssid(&bssid));

        Self {
            vendor: lookup_vendor(&bssid),
            ssid,
            signal_strength: ap.signal,
            frequency_mhz: ap.frequency_mhz,
            channel: ap.frequency_mhz.map(frequency_to_channel).unwrap_or(0),
            security: security::classify(&ap.capabilities),
            interface_name: interface_name.to_string(),
            observed_at: now,
            first_seen_at: now,
            last_seen_at: now,
            position: None,
            bssid,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

/// Placeholder name for networks that do not broadcast an SSID
pub fn hidden_ssid(bssid: &str) -> String {
    format!("Hidden_{}", bssid)
}

/// What a merge did to the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First sighting of this BSSID
    Inserted,
    /// Stronger signal replaced the stored observation
    Strengthened,
    /// Weaker or equal signal; only `last_seen_at` moved
    Refreshed,
    /// Candidate had no identifier
    Dropped,
}

/// Aggregate counters for the session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_networks: usize,
    pub open_networks: usize,
    pub wep_networks: usize,
    pub wpa_networks: usize,
    pub unknown_networks: usize,
    pub by_security: BTreeMap<Security, usize>,
    pub networks_with_position: usize,
    pub locations_recorded: usize,
    pub discoveries: u64,
    pub scan_duration_secs: f64,
}

impl Statistics {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs_f64(self.scan_duration_secs.max(0.0))
    }
}

/// Immutable copy of the dataset for export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub networks: Vec<NetworkRecord>,
    pub track: Vec<PositionSample>,
}

impl Snapshot {
    pub fn located_networks(&self) -> impl Iterator<Item = (&NetworkRecord, Position)> {
        self.networks
            .iter()
            .filter_map(|n| n.position.map(|p| (n, p)))
    }
}

/// Owner of all session state
#[derive(Debug, Default)]
pub struct Aggregator {
    records: Vec<NetworkRecord>,
    index: HashMap<String, usize>,
    positions: Vec<PositionSample>,
    current_position: Option<PositionSample>,
    scan_started_at: Option<DateTime<Utc>>,
    discoveries: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an observation, timestamped now.
    pub fn merge(&mut self, candidate: NetworkRecord, position: Option<&PositionSample>) -> MergeOutcome {
        self.merge_at(candidate, position, Utc::now())
    }

    /// Merge an observation made at `now`.
    pub fn merge_at(
        &mut self,
        mut candidate: NetworkRecord,
        position: Option<&PositionSample>,
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        let bssid = canonical_bssid(&candidate.bssid);
        if bssid.is_empty() {
            tracing::trace!("Dropping candidate without BSSID");
            return MergeOutcome::Dropped;
        }
        candidate.bssid = bssid;

        if let Some(sample) = position {
            candidate.position = Some(sample.position());
        }

        match self.index.get(&candidate.bssid) {
            Some(&i) => {
                let existing = &mut self.records[i];
                // Wall-clock steps backwards must not rewind the record
                let last_seen_at = now.max(existing.last_seen_at);

                if candidate.signal_strength > existing.signal_strength {
                    tracing::trace!(
                        "{} strengthened: {} -> {}",
                        existing.bssid,
                        existing.signal_strength,
                        candidate.signal_strength
                    );
                    let first_seen_at = existing.first_seen_at;
                    // An observation without a fix keeps the best known location
                    let position = candidate.position.or(existing.position);
                    *existing = NetworkRecord {
                        observed_at: now,
                        first_seen_at,
                        last_seen_at,
                        position,
                        ..candidate
                    };
                    MergeOutcome::Strengthened
                } else {
                    existing.last_seen_at = last_seen_at;
                    MergeOutcome::Refreshed
                }
            }
            None => {
                candidate.observed_at = now;
                candidate.first_seen_at = now;
                candidate.last_seen_at = now;

                tracing::debug!(
                    "New network: {} ({}, {}, {})",
                    candidate.ssid,
                    candidate.bssid,
                    candidate.security,
                    candidate.signal_strength
                );

                self.index.insert(candidate.bssid.clone(), self.records.len());
                self.records.push(candidate);
                self.discoveries += 1;
                MergeOutcome::Inserted
            }
        }
    }

    /// Append a fix to the movement history and make it current.
    ///
    /// Existing records keep the positions they were merged with.
    pub fn record_position(&mut self, sample: PositionSample) {
        self.current_position = Some(sample);
        self.positions.push(sample);
    }

    /// Stamp the session start used for the elapsed duration (first call wins).
    pub fn mark_scan_started(&mut self, at: DateTime<Utc>) {
        self.scan_started_at.get_or_insert(at);
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, bssid: &str) -> Option<&NetworkRecord> {
        self.index
            .get(&canonical_bssid(bssid))
            .map(|&i| &self.records[i])
    }

    /// Records in discovery order.
    pub fn all(&self) -> Vec<NetworkRecord> {
        self.records.clone()
    }

    pub fn position_history(&self) -> &[PositionSample] {
        &self.positions
    }

    pub fn current_position(&self) -> Option<&PositionSample> {
        self.current_position.as_ref()
    }

    pub fn discoveries(&self) -> u64 {
        self.discoveries
    }

    pub fn scan_started_at(&self) -> Option<DateTime<Utc>> {
        self.scan_started_at
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            networks: self.all(),
            track: self.positions.clone(),
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics_at(Utc::now())
    }

    pub fn statistics_at(&self, now: DateTime<Utc>) -> Statistics {
        let mut by_security: BTreeMap<Security, usize> = BTreeMap::new();
        for record in &self.records {
            *by_security.entry(record.security).or_default() += 1;
        }

        let scan_duration_secs = self
            .scan_started_at
            .map(|start| (now - start).num_milliseconds().max(0) as f64 / 1000.0)
            .unwrap_or(0.0);

        Statistics {
            total_networks: self.records.len(),
            open_networks: by_security.get(&Security::Open).copied().unwrap_or(0),
            wep_networks: by_security.get(&Security::Wep).copied().unwrap_or(0),
            wpa_networks: self
                .records
                .iter()
                .filter(|r| r.security.is_wpa_family())
                .count(),
            unknown_networks: by_security.get(&Security::Unknown).copied().unwrap_or(0),
            by_security,
            networks_with_position: self.records.iter().filter(|r| r.has_position()).count(),
            locations_recorded: self.positions.len(),
            discoveries: self.discoveries,
            scan_duration_secs,
        }
    }

    /// Drop every record and the movement history.
    pub fn clear(&mut self) {
        tracing::info!(
            "Clearing session data: {} networks, {} positions",
            self.records.len(),
            self.positions.len()
        );
        self.records.clear();
        self.index.clear();
        self.positions.clear();
        self.current_position = None;
        self.discoveries = 0;
    }
}
