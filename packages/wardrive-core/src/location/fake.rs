//! Scriptable position provider for tests.

use super::{PositionFix, PositionProvider};
use crate::error::PositionError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeState {
    sink: Option<mpsc::Sender<PositionFix>>,
    fail_next_subscribe: bool,
}

pub(crate) struct FakePosition {
    state: Arc<Mutex<FakeState>>,
}

/// Test-side handle used to push fixes after the provider was boxed.
#[derive(Clone)]
pub(crate) struct FakePositionHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakePosition {
    pub fn new() -> (Self, FakePositionHandle) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                state: state.clone(),
            },
            FakePositionHandle { state },
        )
    }
}

impl FakePositionHandle {
    /// Returns whether the fix reached a live subscription.
    pub async fn push(&self, latitude: f64, longitude: f64, accuracy_meters: f64) -> bool {
        let sink = self.state.lock().unwrap().sink.clone();
        match sink {
            Some(sink) => sink
                .send(PositionFix {
                    latitude,
                    longitude,
                    accuracy_meters,
                })
                .await
                .is_ok(),
            None => false,
        }
    }

    pub fn fail_next_subscribe(&self) {
        self.state.lock().unwrap().fail_next_subscribe = true;
    }

    /// Simulate the service going away.
    pub fn close(&self) {
        self.state.lock().unwrap().sink = None;
    }
}

#[async_trait]
impl PositionProvider for FakePosition {
    fn name(&self) -> &str {
        "fake"
    }

    async fn subscribe(&mut self, sink: mpsc::Sender<PositionFix>) -> Result<(), PositionError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_subscribe) {
            return Err(PositionError::Unavailable("fake service down".to_string()));
        }
        state.sink = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&mut self) {
        self.state.lock().unwrap().sink = None;
    }
}
