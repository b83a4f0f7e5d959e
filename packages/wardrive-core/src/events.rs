//! Lifecycle notifications for observers (CLI output, UI front-ends).

use crate::aggregator::PositionSample;
use crate::radio::ScanMode;
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events published by the scan loop and position tracker
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WardriveEvent {
    ScanStarted { interfaces: Vec<String> },
    /// Outcome of the active scan requests issued on start
    ScanMode { mode: ScanMode },
    ScanStopped,
    ScanError { message: String },
    NetworkDiscovered { bssid: String, ssid: String },
    TickCompleted { visible: usize, new_networks: usize, total_networks: usize },
    PositionUpdated { sample: PositionSample },
    PositionError { message: String },
}

/// Bounded broadcast channel of [`WardriveEvent`]s.
///
/// Slow observers lag and lose old events; publishers never block.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WardriveEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WardriveEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: WardriveEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}
