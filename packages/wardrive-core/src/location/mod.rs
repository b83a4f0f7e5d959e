//! Position tracking module.
//!
//! A [`PositionProvider`] pushes fixes into a channel; the [`PositionTracker`]
//! owns the receiving end, remembers the latest fix and turns each update into
//! a timestamped [`PositionSample`].

pub mod fixed;
pub mod gpsd;

#[cfg(test)]
pub(crate) mod fake;

pub use fixed::FixedPosition;
pub use gpsd::GpsdProvider;

use crate::aggregator::PositionSample;
use crate::error::PositionError;
use crate::events::{EventBus, WardriveEvent};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

const FIX_CHANNEL_CAPACITY: usize = 64;

/// Raw update pushed by a provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

/// Capability handle for the host geolocation service.
#[async_trait]
pub trait PositionProvider: Send {
    fn name(&self) -> &str;

    /// Start delivering fixes into `sink` until [`unsubscribe`](Self::unsubscribe).
    async fn subscribe(&mut self, sink: mpsc::Sender<PositionFix>) -> Result<(), PositionError>;

    /// Stop delivering fixes. Must be safe to call when not subscribed.
    async fn unsubscribe(&mut self);
}

/// Provider used when location is disabled.
///
/// Never delivers a fix. The sink stays open until unsubscribed.
#[derive(Debug, Default)]
pub struct NoPosition {
    sink: Option<mpsc::Sender<PositionFix>>,
}

impl NoPosition {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionProvider for NoPosition {
    fn name(&self) -> &str {
        "none"
    }

    async fn subscribe(&mut self, sink: mpsc::Sender<PositionFix>) -> Result<(), PositionError> {
        self.sink = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&mut self) {
        self.sink = None;
    }
}

/// Subscription wrapper that keeps the last known fix
pub struct PositionTracker {
    provider: Box<dyn PositionProvider>,
    rx: Option<mpsc::Receiver<PositionFix>>,
    current: Option<PositionSample>,
    events: EventBus,
}

impl PositionTracker {
    pub fn new(provider: Box<dyn PositionProvider>, events: EventBus) -> Self {
        Self {
            provider,
            rx: None,
            current: None,
            events,
        }
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    /// Subscribe to the provider. Returns whether updates are now flowing.
    ///
    /// Failure is published as [`WardriveEvent::PositionError`] and leaves the
    /// tracker inactive; calling `start` again later is safe.
    pub async fn start(&mut self) -> bool {
        if self.is_active() {
            return true;
        }

        tracing::info!("Starting location service ({})", self.provider.name());

        let (tx, rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        match self.provider.subscribe(tx).await {
            Ok(()) => {
                self.rx = Some(rx);
                tracing::info!("Location service started");
                true
            }
            Err(e) => {
                tracing::warn!("Location service unavailable: {}", e);
                self.events.emit(WardriveEvent::PositionError {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Tear down the subscription. Fixes already queued are discarded.
    pub async fn stop(&mut self) {
        if self.rx.take().is_some() {
            self.provider.unsubscribe().await;
            tracing::info!("Location service stopped");
        }
    }

    /// Latest known fix, if any.
    pub fn current_position(&self) -> Option<PositionSample> {
        self.current
    }

    /// Wait for the next fix.
    ///
    /// Pends forever while inactive. Returns `None` once when the provider's
    /// stream ends, after which the tracker is inactive.
    pub async fn next_update(&mut self) -> Option<PositionSample> {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };

        match rx.recv().await {
            Some(fix) => Some(self.accept(fix)),
            None => {
                tracing::warn!("Position stream from {} ended", self.provider.name());
                self.rx = None;
                self.events.emit(WardriveEvent::PositionError {
                    message: format!("{} stopped delivering positions", self.provider.name()),
                });
                None
            }
        }
    }

    fn accept(&mut self, fix: PositionFix) -> PositionSample {
        let sample = PositionSample::new(fix.latitude, fix.longitude, fix.accuracy_meters, Utc::now());
        tracing::debug!(
            "Location updated: {:.6}, {:.6} (±{:.1}m)",
            sample.latitude,
            sample.longitude,
            sample.accuracy_meters
        );
        self.current = Some(sample);
        self.events.emit(WardriveEvent::PositionUpdated { sample });
        sample
    }
}
