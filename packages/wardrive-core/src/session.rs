//! Cooperative driver for a wardriving session.
//!
//! [`Wardriver`] owns the scan loop, the position tracker and the aggregator,
//! and multiplexes scan ticks and position updates on the calling task.
//! Nothing else can mutate the session while it runs.

use crate::aggregator::{Aggregator, PositionSample, Snapshot, Statistics};
use crate::config::Settings;
use crate::error::ExportError;
use crate::events::{EventBus, WardriveEvent};
use crate::export::{self, ExportFormat};
use crate::location::{PositionProvider, PositionTracker};
use crate::radio::{RadioProvider, ScanCapabilities};
use crate::scan_loop::{ScanLoop, TickReport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// One unit of work performed by [`Wardriver::step`]
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Tick(TickReport),
    Position(PositionSample),
    /// The position stream ended; the tracker is now inactive
    PositionLost,
}

pub struct Wardriver {
    scan_loop: ScanLoop,
    tracker: PositionTracker,
    aggregator: Aggregator,
    events: EventBus,
}

impl Wardriver {
    pub fn new(
        radio: Arc<dyn RadioProvider>,
        position: Box<dyn PositionProvider>,
        scan_interval: Duration,
    ) -> Self {
        let events = EventBus::new();
        Self {
            scan_loop: ScanLoop::with_interval(radio, events.clone(), scan_interval),
            tracker: PositionTracker::new(position, events.clone()),
            aggregator: Aggregator::new(),
            events,
        }
    }

    /// Build a session from resolved settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.radio_provider(),
            settings.position_provider(),
            settings.scan_interval(),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WardriveEvent> {
        self.events.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_loop.is_scanning()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn capabilities(&self) -> &ScanCapabilities {
        self.scan_loop.capabilities()
    }

    /// Start position tracking and scanning. Returns whether scanning started.
    ///
    /// Position failure is reported as an event and does not prevent scanning.
    pub async fn start(&mut self) -> bool {
        self.tracker.start().await;
        let scanning = self.scan_loop.start().await;
        if scanning {
            self.aggregator.mark_scan_started(chrono::Utc::now());
        }
        scanning
    }

    /// Stop scanning and tracking. Nothing mutates the session afterwards.
    pub async fn stop(&mut self) {
        self.scan_loop.stop();
        self.tracker.stop().await;
    }

    /// Wait for and handle the next tick or position update.
    ///
    /// Pends forever when neither scanning nor tracking.
    pub async fn step(&mut self) -> Step {
        tokio::select! {
            update = self.tracker.next_update() => match update {
                Some(sample) => {
                    self.aggregator.record_position(sample);
                    Step::Position(sample)
                }
                None => Step::PositionLost,
            },
            _ = self.scan_loop.next_tick() => {
                let position = self.tracker.current_position();
                Step::Tick(self.scan_loop.tick(&mut self.aggregator, position.as_ref()).await)
            }
        }
    }

    /// Run until `cancel` fires, then stop.
    pub async fn run_until_cancelled(&mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                step = self.step() => {
                    if step == Step::PositionLost {
                        tracing::warn!("Continuing without position updates");
                    }
                }
            }
        }
        tracing::debug!("Session cancelled");
        self.stop().await;
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn snapshot(&self) -> Snapshot {
        self.aggregator.snapshot()
    }

    pub fn statistics(&self) -> Statistics {
        self.aggregator.statistics()
    }

    /// Discard collected networks and the movement history.
    pub fn clear(&mut self) {
        self.aggregator.clear();
    }

    pub fn export(&self, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
        export::export_to_path(&self.aggregator.snapshot(), format, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::NoPosition;
    use crate::location::fake::FakePosition;
    use crate::radio::fake::{FakeRadio, access_point};

    fn wardriver(radio: &Arc<FakeRadio>, position: FakePosition) -> Wardriver {
        Wardriver::new(radio.clone(), Box::new(position), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_then_tick_geotags_networks() {
        let radio = Arc::new(FakeRadio::with_interfaces(&["wlan0"]));
        radio.set_visible("wlan0", vec![access_point("aa:bb:cc:00:00:01", "Cafe", -55, 2412)]);
        let (position, handle) = FakePosition::new();
        let mut session = wardriver(&radio, position);

        assert!(session.start().await);
        assert!(session.is_tracking());
        assert!(handle.push(59.3293, 18.0686, 9.0).await);

        assert!(matches!(session.step().await, Step::Position(_)));
        let Step::Tick(report) = session.step().await else {
            panic!("expected a tick");
        };
        assert_eq!(report.new_networks, 1);

        let record = session.aggregator().get("AA:BB:CC:00:00:01").unwrap();
        assert_eq!(record.position.unwrap().latitude, 59.3293);
        assert_eq!(session.aggregator().position_history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scanning_continues_without_position() {
        let radio = Arc::new(FakeRadio::with_interfaces(&["wlan0"]));
        radio.set_visible("wlan0", vec![access_point("aa:bb:cc:00:00:01", "Cafe", -55, 2412)]);
        let (position, handle) = FakePosition::new();
        handle.fail_next_subscribe();

        let mut session = wardriver(&radio, position);
        let mut events = session.subscribe();
        assert!(session.start().await);
        assert!(!session.is_tracking());
        assert!(matches!(events.try_recv(), Ok(WardriveEvent::PositionError { .. })));

        assert!(matches!(session.step().await, Step::Tick(_)));
        assert!(!session.aggregator().get("AA:BB:CC:00:00:01").unwrap().has_position());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_location_is_not_an_error() {
        let radio = Arc::new(FakeRadio::with_interfaces(&["wlan0"]));
        radio.set_visible("wlan0", vec![access_point("aa:bb:cc:00:00:01", "Cafe", -55, 2412)]);
        let mut session = Wardriver::new(radio.clone(), Box::new(NoPosition::new()), Duration::from_secs(1));
        let mut events = session.subscribe();

        assert!(session.start().await);
        assert!(matches!(session.step().await, Step::Tick(_)));
        assert!(matches!(session.step().await, Step::Tick(_)));
        assert!(session.is_tracking());

        let position_errors = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| matches!(e, WardriveEvent::PositionError { .. }))
            .count();
        assert_eq!(position_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_cancelled() {
        let radio = Arc::new(FakeRadio::with_interfaces(&["wlan0"]));
        radio.set_visible("wlan0", vec![access_point("aa:bb:cc:00:00:01", "Cafe", -55, 2412)]);
        let (position, _handle) = FakePosition::new();
        let mut session = wardriver(&radio, position);
        let mut events = session.subscribe();
        session.start().await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            trigger.cancel();
        });
        session.run_until_cancelled(cancel).await;

        assert!(!session.is_scanning());
        assert!(!session.is_tracking());
        assert_eq!(session.aggregator().count(), 1);

        let ticks = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| matches!(e, WardriveEvent::TickCompleted { .. }))
            .count();
        assert_eq!(ticks, 3);

        // Stopped sessions no longer mutate
        radio.set_visible("wlan0", vec![access_point("aa:bb:cc:00:00:02", "Other", -40, 2412)]);
        let idle = tokio::time::timeout(Duration::from_secs(5), session.step()).await;
        assert!(idle.is_err());
        assert_eq!(session.aggregator().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_and_clear() {
        let radio = Arc::new(FakeRadio::with_interfaces(&["wlan0"]));
        radio.set_visible("wlan0", vec![access_point("aa:bb:cc:00:00:01", "Cafe", -55, 2412)]);
        let (position, _handle) = FakePosition::new();
        let mut session = wardriver(&radio, position);
        session.start().await;
        session.step().await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ExportFormat::Csv.default_file_name());
        session.export(ExportFormat::Csv, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("AA:BB:CC:00:00:01"));

        session.clear();
        assert_eq!(session.aggregator().count(), 0);
        assert!(session.aggregator().scan_started_at().is_some());
    }
}
