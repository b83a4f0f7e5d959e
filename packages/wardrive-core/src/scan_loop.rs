//! Periodic scan driver.
//!
//! [`ScanLoop`] does not own a task. Whoever owns it (normally
//! [`crate::session::Wardriver`]) awaits [`ScanLoop::next_tick`] and then calls
//! [`ScanLoop::tick`] with the aggregator, which keeps every mutation of the
//! session on one task.

use crate::aggregator::{Aggregator, MergeOutcome, NetworkRecord, PositionSample};
use crate::events::{EventBus, WardriveEvent};
use crate::radio::{RadioInterface, RadioProvider, ScanCapabilities, ScanRequestOutcome};
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks between monitoring summaries in the log
const SUMMARY_EVERY_TICKS: u64 = 10;

/// What a single tick observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// Access points enumerated across all interfaces
    pub visible: usize,
    pub new_networks: usize,
    pub strengthened: usize,
    /// Interfaces whose enumeration failed this tick
    pub failed_interfaces: Vec<String>,
}

enum LoopState {
    Idle,
    Scanning {
        ticker: Interval,
        /// Background active-scan requests issued on start
        requests: JoinHandle<()>,
        outcomes: mpsc::UnboundedReceiver<(String, ScanRequestOutcome)>,
    },
}

pub struct ScanLoop {
    radio: Arc<dyn RadioProvider>,
    period: Duration,
    state: LoopState,
    events: EventBus,
    ticks: u64,
    capabilities: ScanCapabilities,
}

impl ScanLoop {
    pub fn new(radio: Arc<dyn RadioProvider>, events: EventBus) -> Self {
        Self::with_interval(radio, events, DEFAULT_SCAN_INTERVAL)
    }

    pub fn with_interval(radio: Arc<dyn RadioProvider>, events: EventBus, period: Duration) -> Self {
        Self {
            radio,
            period: period.max(Duration::from_millis(10)),
            state: LoopState::Idle,
            events,
            ticks: 0,
            capabilities: ScanCapabilities::default(),
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, LoopState::Scanning { .. })
    }

    /// Outcome of the active scan requests seen so far.
    pub fn capabilities(&self) -> &ScanCapabilities {
        &self.capabilities
    }

    /// Begin scanning. Returns whether the loop is now scanning.
    ///
    /// Issues one best-effort active scan request per interface in the
    /// background. If the radio subsystem cannot be reached a
    /// [`WardriveEvent::ScanError`] is published and the loop stays idle.
    pub async fn start(&mut self) -> bool {
        if self.is_scanning() {
            tracing::debug!("Scan loop already running");
            return true;
        }

        let interfaces = match self.radio.list_interfaces().await {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::error!("Cannot start scanning: {}", e);
                self.events.emit(WardriveEvent::ScanError {
                    message: e.to_string(),
                });
                return false;
            }
        };

        let names: Vec<String> = interfaces.iter().map(|i| i.name.clone()).collect();
        tracing::info!(
            "Starting {} scan loop every {:?} on {} interface(s): {}",
            self.radio.name(),
            self.period,
            names.len(),
            names.join(", ")
        );
        if interfaces.is_empty() {
            tracing::warn!("No wireless interfaces found; ticks will observe nothing until one appears");
            self.events.emit(WardriveEvent::ScanError {
                message: "No Wi-Fi devices found".to_string(),
            });
        }

        self.capabilities = ScanCapabilities::default();
        self.ticks = 0;

        let (tx, outcomes) = mpsc::unbounded_channel();
        let requests = tokio::spawn(request_active_scans(self.radio.clone(), interfaces, tx));

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.state = LoopState::Scanning {
            ticker,
            requests,
            outcomes,
        };
        self.events.emit(WardriveEvent::ScanStarted { interfaces: names });
        true
    }

    /// Halt the cycle and cancel pending scan requests. Safe to call when idle.
    pub fn stop(&mut self) {
        if let LoopState::Scanning { requests, .. } = std::mem::replace(&mut self.state, LoopState::Idle) {
            requests.abort();
            tracing::info!("Scan loop stopped after {} tick(s)", self.ticks);
            self.events.emit(WardriveEvent::ScanStopped);
        }
    }

    /// Wait for the next tick. Pends forever while idle.
    pub async fn next_tick(&mut self) {
        match &mut self.state {
            LoopState::Scanning { ticker, .. } => {
                ticker.tick().await;
            }
            LoopState::Idle => std::future::pending().await,
        }
    }

    /// Observe every interface once and merge what is visible.
    ///
    /// A no-op returning an empty report while idle.
    pub async fn tick(&mut self, aggregator: &mut Aggregator, position: Option<&PositionSample>) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_scanning() {
            return report;
        }

        self.drain_scan_outcomes();
        self.ticks += 1;

        let interfaces = match self.radio.list_interfaces().await {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::warn!("Radio subsystem unreachable: {}", e);
                self.events.emit(WardriveEvent::ScanError {
                    message: e.to_string(),
                });
                return report;
            }
        };

        let now = Utc::now();
        for interface in &interfaces {
            let access_points = match self.radio.visible_access_points(interface).await {
                Ok(aps) => aps,
                Err(e) => {
                    tracing::warn!("Skipping {} this tick: {}", interface.name, e);
                    report.failed_interfaces.push(interface.name.clone());
                    continue;
                }
            };

            report.visible += access_points.len();
            for ap in &access_points {
                let candidate = NetworkRecord::from_access_point(ap, &interface.name, now);
                let (bssid, ssid) = (candidate.bssid.clone(), candidate.ssid.clone());
                match aggregator.merge_at(candidate, position, now) {
                    MergeOutcome::Inserted => {
                        report.new_networks += 1;
                        self.events.emit(WardriveEvent::NetworkDiscovered { bssid, ssid });
                    }
                    MergeOutcome::Strengthened => report.strengthened += 1,
                    MergeOutcome::Refreshed | MergeOutcome::Dropped => {}
                }
            }
        }

        self.events.emit(WardriveEvent::TickCompleted {
            visible: report.visible,
            new_networks: report.new_networks,
            total_networks: aggregator.count(),
        });

        if self.ticks % SUMMARY_EVERY_TICKS == 0 {
            tracing::info!(
                "Monitoring ({} mode): {} visible, {} total networks, {} new this tick",
                self.capabilities.mode,
                report.visible,
                aggregator.count(),
                report.new_networks
            );
        }

        report
    }

    fn drain_scan_outcomes(&mut self) {
        let LoopState::Scanning { outcomes, .. } = &mut self.state else {
            return;
        };

        let mut changed = false;
        while let Ok((interface, outcome)) = outcomes.try_recv() {
            self.capabilities.record(&interface, outcome);
            changed = true;
        }

        if changed {
            if let Some(warning) = &self.capabilities.warning {
                tracing::info!("{}", warning);
            }
            self.events.emit(WardriveEvent::ScanMode {
                mode: self.capabilities.mode,
            });
        }
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        if let LoopState::Scanning { requests, .. } = &self.state {
            requests.abort();
        }
    }
}

async fn request_active_scans(
    radio: Arc<dyn RadioProvider>,
    interfaces: Vec<RadioInterface>,
    outcomes: mpsc::UnboundedSender<(String, ScanRequestOutcome)>,
) {
    let requests = interfaces.iter().map(|interface| {
        let radio = radio.clone();
        async move { (interface.name.clone(), radio.request_scan(interface).await) }
    });

    for (name, result) in join_all(requests).await {
        let outcome = ScanRequestOutcome::from_result(&result);
        match result {
            Ok(()) => tracing::debug!("Active scan requested on {}", name),
            Err(_) if outcome == ScanRequestOutcome::Refused => {
                tracing::info!("Active scan refused on {}, continuing passively", name)
            }
            Err(e) => tracing::warn!("Active scan request on {} failed: {}", name, e),
        }
        // Receiver is gone once the loop stopped
        let _ = outcomes.send((name, outcome));
    }
}
