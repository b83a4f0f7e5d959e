//! Radio observation module.
//!
//! Abstracts the host wireless subsystem behind [`RadioProvider`]:
//! - interface enumeration
//! - best-effort active scan requests (refusal falls back to passive monitoring)
//! - visible access point listing with raw attributes
//!
//! The NetworkManager backend in [`nmcli`] is the production implementation.

pub mod channel;
pub mod nmcli;
pub mod oui;
pub mod privileges;
pub mod security;

#[cfg(test)]
pub(crate) mod fake;

pub use channel::frequency_to_channel;
pub use privileges::{ScanCapabilities, ScanMode, ScanRequestOutcome};
pub use security::{CapabilityFlags, Security};

use crate::error::RadioError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Command;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Create a Command that hides the console window on Windows.
pub(crate) fn hidden_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

/// A wireless interface able to observe access points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioInterface {
    /// Kernel interface name (e.g. `wlan0`)
    pub name: String,
    /// Backend-reported state, if any
    pub state: Option<String>,
}

impl RadioInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
        }
    }
}

/// An access point as reported by the backend, before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccessPoint {
    pub bssid: String,
    /// Broadcast name; `None` or empty for hidden networks
    pub ssid: Option<String>,
    /// Provider-native scale, higher is stronger
    pub signal: i32,
    pub frequency_mhz: Option<u32>,
    pub capabilities: CapabilityFlags,
}

/// Capability handle for the host wireless subsystem.
///
/// Implementations are injected into the scan loop; tests substitute fakes.
#[async_trait]
pub trait RadioProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Enumerate wireless interfaces.
    ///
    /// An error here means the subsystem itself could not be reached.
    async fn list_interfaces(&self) -> Result<Vec<RadioInterface>, RadioError>;

    /// Ask the interface to perform an active scan.
    ///
    /// [`RadioError::NotAuthorized`] is expected in unprivileged or sandboxed
    /// environments and is not a fault.
    async fn request_scan(&self, interface: &RadioInterface) -> Result<(), RadioError>;

    /// Access points currently visible on the interface.
    async fn visible_access_points(
        &self,
        interface: &RadioInterface,
    ) -> Result<Vec<RawAccessPoint>, RadioError>;
}
