//! Scan capability reporting
//!
//! Active scans usually need authorization from the wireless daemon:
//! - Linux: NetworkManager polkit policy (`org.freedesktop.NetworkManager.wifi.scan`),
//!   typically denied inside Flatpak or over SSH
//! - Root always passes the polkit check
//!
//! Without it the scan loop still works from passive observation.

use crate::error::RadioError;
use serde::{Deserialize, Serialize};

/// How access points are being discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// At least one interface accepted an active scan request
    Active,
    /// Only beacons and scans triggered by other clients are seen
    Passive,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Active => write!(f, "active"),
            ScanMode::Passive => write!(f, "passive"),
        }
    }
}

/// Result of one active scan request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRequestOutcome {
    Granted,
    /// The wireless daemon denied the request
    Refused,
    /// The request failed for another reason
    Failed,
}

impl ScanRequestOutcome {
    pub fn from_result(result: &Result<(), RadioError>) -> Self {
        match result {
            Ok(()) => ScanRequestOutcome::Granted,
            Err(e) if e.is_refusal() => ScanRequestOutcome::Refused,
            Err(_) => ScanRequestOutcome::Failed,
        }
    }
}

/// Outcome of the active scan requests issued on start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCapabilities {
    pub mode: ScanMode,
    pub is_elevated: bool,
    pub active_interfaces: Vec<String>,
    /// Every interface without active scans, refused or failed
    pub passive_interfaces: Vec<String>,
    /// The subset of `passive_interfaces` that was refused authorization
    pub refused_interfaces: Vec<String>,
    pub warning: Option<String>,
    pub elevation_instructions: Option<String>,
}

impl Default for ScanCapabilities {
    fn default() -> Self {
        Self {
            mode: ScanMode::Passive,
            is_elevated: is_elevated(),
            active_interfaces: Vec::new(),
            passive_interfaces: Vec::new(),
            refused_interfaces: Vec::new(),
            warning: None,
            elevation_instructions: None,
        }
    }
}

impl ScanCapabilities {
    /// Record the result of an active scan request on one interface.
    pub fn record(&mut self, interface: &str, outcome: ScanRequestOutcome) {
        self.active_interfaces.retain(|i| i != interface);
        self.passive_interfaces.retain(|i| i != interface);
        self.refused_interfaces.retain(|i| i != interface);

        match outcome {
            ScanRequestOutcome::Granted => self.active_interfaces.push(interface.to_string()),
            ScanRequestOutcome::Refused => {
                self.passive_interfaces.push(interface.to_string());
                self.refused_interfaces.push(interface.to_string());
            }
            ScanRequestOutcome::Failed => self.passive_interfaces.push(interface.to_string()),
        }

        if !self.active_interfaces.is_empty() {
            self.mode = ScanMode::Active;
            self.warning = None;
            self.elevation_instructions = None;
        } else if self.refused_interfaces.is_empty() {
            self.mode = ScanMode::Passive;
            self.warning = Some(
                "Active scan requests failed. Networks are detected as they beacon.".to_string(),
            );
            self.elevation_instructions = None;
        } else {
            self.mode = ScanMode::Passive;
            self.warning = Some(
                "Active scanning not authorized. Networks are detected as they beacon."
                    .to_string(),
            );
            self.elevation_instructions = Some(get_elevation_instructions());
        }
    }

    pub fn was_refused(&self, interface: &str) -> bool {
        self.refused_interfaces.iter().any(|i| i == interface)
    }
}

/// Check if the current process is running with elevated privileges
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Get platform-specific instructions for enabling active scans
pub fn get_elevation_instructions() -> String {
    #[cfg(target_os = "linux")]
    {
        "To enable active scanning on Linux:\n\
         \n\
         Option 1 - Run from a local desktop session (polkit allows active sessions)\n\
         \n\
         Option 2 - Grant the scan action to your user with a polkit rule:\n\
         polkit.addRule(function(action, subject) {\n\
             if (action.id == \"org.freedesktop.NetworkManager.wifi.scan\" &&\n\
                 subject.user == \"<you>\") return polkit.Result.YES;\n\
         });\n\
         \n\
         Option 3 - Run as root (not recommended for regular use):\n\
         $ sudo wardrive drive\n\
         \n\
         Passive monitoring keeps working without any of these."
            .to_string()
    }

    #[cfg(not(target_os = "linux"))]
    {
        "Active scanning may require elevated privileges.\n\
         Please consult your operating system documentation."
            .to_string()
    }
}

/// Format a user-friendly message about current scan capabilities
pub fn format_capabilities_message(caps: &ScanCapabilities) -> String {
    match caps.mode {
        ScanMode::Active => format!(
            "Active scanning on: {}",
            caps.active_interfaces.join(", ")
        ),
        ScanMode::Passive => {
            let mut msg = String::from("Passive monitoring only:\n");
            for iface in &caps.passive_interfaces {
                if caps.was_refused(iface) {
                    msg.push_str(&format!("  - {} refused active scan requests\n", iface));
                } else {
                    msg.push_str(&format!("  - {} could not request an active scan\n", iface));
                }
            }
            if let Some(ref instructions) = caps.elevation_instructions {
                msg.push('\n');
                msg.push_str(instructions);
            }
            msg
        }
    }
}
