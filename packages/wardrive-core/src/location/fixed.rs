//! Stationary provider that reports one configured position.

use super::{PositionFix, PositionProvider};
use crate::error::PositionError;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug)]
pub struct FixedPosition {
    fix: PositionFix,
    sink: Option<mpsc::Sender<PositionFix>>,
}

impl FixedPosition {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        Self {
            fix: PositionFix {
                latitude,
                longitude,
                accuracy_meters,
            },
            sink: None,
        }
    }
}

#[async_trait]
impl PositionProvider for FixedPosition {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn subscribe(&mut self, sink: mpsc::Sender<PositionFix>) -> Result<(), PositionError> {
        if !(-90.0..=90.0).contains(&self.fix.latitude)
            || !(-180.0..=180.0).contains(&self.fix.longitude)
        {
            return Err(PositionError::Unavailable(format!(
                "configured position {}, {} is out of range",
                self.fix.latitude, self.fix.longitude
            )));
        }

        sink.send(self.fix)
            .await
            .map_err(|_| PositionError::Unavailable("tracker went away".to_string()))?;
        // Holding the sender keeps the stream open
        self.sink = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&mut self) {
        self.sink = None;
    }
}
