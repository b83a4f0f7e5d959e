//! In-memory radio provider for tests.

use super::{CapabilityFlags, RadioInterface, RadioProvider, RawAccessPoint};
use crate::error::RadioError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct FakeRadio {
    interfaces: Mutex<Vec<RadioInterface>>,
    access_points: Mutex<HashMap<String, Vec<RawAccessPoint>>>,
    failing_interfaces: Mutex<Vec<String>>,
    pub refuse_scans: AtomicBool,
    pub fail_scans: AtomicBool,
    pub unavailable: AtomicBool,
    pub scan_requests: AtomicUsize,
}

impl FakeRadio {
    pub fn with_interfaces(names: &[&str]) -> Self {
        let radio = Self::default();
        *radio.interfaces.lock().unwrap() = names.iter().map(|n| RadioInterface::new(*n)).collect();
        radio
    }

    pub fn add_interface(&self, name: &str) {
        self.interfaces.lock().unwrap().push(RadioInterface::new(name));
    }

    pub fn set_visible(&self, interface: &str, aps: Vec<RawAccessPoint>) {
        self.access_points
            .lock()
            .unwrap()
            .insert(interface.to_string(), aps);
    }

    pub fn fail_interface(&self, interface: &str) {
        self.failing_interfaces
            .lock()
            .unwrap()
            .push(interface.to_string());
    }
}

pub(crate) fn access_point(bssid: &str, ssid: &str, signal: i32, frequency: u32) -> RawAccessPoint {
    RawAccessPoint {
        bssid: bssid.to_string(),
        ssid: Some(ssid.to_string()).filter(|s| !s.is_empty()),
        signal,
        frequency_mhz: Some(frequency),
        capabilities: CapabilityFlags::open(),
    }
}

#[async_trait]
impl RadioProvider for FakeRadio {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_interfaces(&self) -> Result<Vec<RadioInterface>, RadioError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RadioError::Unavailable("fake radio offline".to_string()));
        }
        Ok(self.interfaces.lock().unwrap().clone())
    }

    async fn request_scan(&self, interface: &RadioInterface) -> Result<(), RadioError> {
        self.scan_requests.fetch_add(1, Ordering::SeqCst);
        if self.refuse_scans.load(Ordering::SeqCst) {
            return Err(RadioError::NotAuthorized(interface.name.clone()));
        }
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(RadioError::Command("rescan timed out".to_string()));
        }
        Ok(())
    }

    async fn visible_access_points(
        &self,
        interface: &RadioInterface,
    ) -> Result<Vec<RawAccessPoint>, RadioError> {
        if self
            .failing_interfaces
            .lock()
            .unwrap()
            .contains(&interface.name)
        {
            return Err(RadioError::Interface {
                name: interface.name.clone(),
                message: "device busy".to_string(),
            });
        }
        Ok(self
            .access_points
            .lock()
            .unwrap()
            .get(&interface.name)
            .cloned()
            .unwrap_or_default())
    }
}
