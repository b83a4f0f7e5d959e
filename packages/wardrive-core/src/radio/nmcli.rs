//! NetworkManager backend using the `nmcli` command-line client

use super::security::{
    AP_FLAGS_PRIVACY, CapabilityFlags, SEC_GROUP_CCMP, SEC_GROUP_TKIP, SEC_GROUP_WEP40,
    SEC_GROUP_WEP104, SEC_KEY_MGMT_802_1X, SEC_KEY_MGMT_EAP_SUITE_B_192, SEC_KEY_MGMT_OWE,
    SEC_KEY_MGMT_OWE_TM, SEC_KEY_MGMT_PSK, SEC_KEY_MGMT_SAE, SEC_PAIR_CCMP, SEC_PAIR_TKIP,
    SEC_PAIR_WEP40, SEC_PAIR_WEP104,
};
use super::{RadioInterface, RadioProvider, RawAccessPoint, hidden_command};
use crate::error::RadioError;
use anyhow::Context;
use async_trait::async_trait;

const NMCLI: &str = "nmcli";

const AP_FIELDS: &str = "BSSID,SSID,SIGNAL,FREQ,SECURITY,WPA-FLAGS,RSN-FLAGS";

/// Radio provider backed by NetworkManager
#[derive(Debug, Default, Clone)]
pub struct NmcliRadio;

impl NmcliRadio {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RadioProvider for NmcliRadio {
    fn name(&self) -> &str {
        "nmcli"
    }

    async fn list_interfaces(&self) -> Result<Vec<RadioInterface>, RadioError> {
        let output = run_nmcli(&["-t", "-f", "DEVICE,TYPE,STATE", "device"]).await?;
        Ok(parse_interfaces(&output))
    }

    async fn request_scan(&self, interface: &RadioInterface) -> Result<(), RadioError> {
        run_nmcli(&["device", "wifi", "rescan", "ifname", &interface.name])
            .await
            .map(|_| ())
            .map_err(|e| match e {
                RadioError::Command(msg) if is_authorization_failure(&msg) => {
                    RadioError::NotAuthorized(interface.name.clone())
                }
                other => other,
            })
    }

    async fn visible_access_points(
        &self,
        interface: &RadioInterface,
    ) -> Result<Vec<RawAccessPoint>, RadioError> {
        let output = run_nmcli(&[
            "-t",
            "-f",
            AP_FIELDS,
            "device",
            "wifi",
            "list",
            "ifname",
            &interface.name,
            "--rescan",
            "no",
        ])
        .await
        .map_err(|e| match e {
            RadioError::Command(message) => RadioError::Interface {
                name: interface.name.clone(),
                message,
            },
            other => other,
        })?;

        Ok(parse_access_points(&output))
    }
}

/// Run nmcli off the async thread and return stdout.
async fn run_nmcli(args: &[&str]) -> Result<String, RadioError> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();

    let output = tokio::task::spawn_blocking(move || {
        hidden_command(NMCLI)
            .args(&args)
            .env("LC_ALL", "C")
            .output()
            .with_context(|| format!("Failed to run {} {}", NMCLI, args.join(" ")))
    })
    .await
    .map_err(|e| RadioError::Command(format!("nmcli task panicked: {}", e)))?
    .map_err(|e| {
        let not_found = e
            .downcast_ref::<std::io::Error>()
            .map(|io| io.kind() == std::io::ErrorKind::NotFound)
            .unwrap_or(false);
        if not_found {
            RadioError::Unavailable("nmcli is not installed".to_string())
        } else {
            RadioError::Unavailable(format!("{:#}", e))
        }
    })?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.contains("NetworkManager is not running") {
        return Err(RadioError::Unavailable(stderr));
    }
    Err(RadioError::Command(stderr))
}

fn is_authorization_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not authorized")
        || lower.contains("authentication")
        || lower.contains("permission denied")
}

/// Split one line of `nmcli -t` output, honouring `\:` and `\\` escapes.
pub(crate) fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn parse_interfaces(output: &str) -> Vec<RadioInterface> {
    output
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line.trim());
            match fields.as_slice() {
                [device, kind, rest @ ..] if kind == "wifi" && !device.is_empty() => {
                    Some(RadioInterface {
                        name: device.clone(),
                        state: rest.first().filter(|s| !s.is_empty()).cloned(),
                    })
                }
                _ => None,
            }
        })
        .collect()
}

fn parse_access_points(output: &str) -> Vec<RawAccessPoint> {
    let mut access_points = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields = split_terse(line);
        if fields.len() < 5 {
            tracing::debug!("Skipping malformed nmcli line: {}", line);
            continue;
        }

        let bssid = fields[0].clone();
        let ssid = Some(fields[1].clone()).filter(|s| !s.is_empty());
        let signal = fields[2].trim().parse::<i32>().unwrap_or(0);
        let frequency_mhz = parse_frequency(&fields[3]);
        let security = fields[4].trim();

        let ap_flags = if security.is_empty() || security == "--" {
            0
        } else {
            AP_FLAGS_PRIVACY
        };

        access_points.push(RawAccessPoint {
            bssid,
            ssid,
            signal,
            frequency_mhz,
            capabilities: CapabilityFlags {
                ap_flags: Some(ap_flags),
                // Older nmcli releases omit the flag columns
                wpa_flags: fields.get(5).map(|f| parse_security_flags(f)),
                rsn_flags: fields.get(6).map(|f| parse_security_flags(f)),
            },
        });
    }

    access_points
}

/// Parse `2437 MHz` into `2437`.
fn parse_frequency(field: &str) -> Option<u32> {
    field
        .split_whitespace()
        .next()
        .and_then(|f| f.parse::<u32>().ok())
}

/// Decode a WPA-FLAGS / RSN-FLAGS column back into the NetworkManager bitmask.
///
/// Tokens this build does not know (newer ciphers) are skipped.
fn parse_security_flags(field: &str) -> u32 {
    let field = field.trim();
    if field.is_empty() || field == "(none)" || field == "--" {
        return 0;
    }

    field.split_whitespace().fold(0u32, |acc, token| {
        let bit = match token {
            "pair_wep40" => SEC_PAIR_WEP40,
            "pair_wep104" => SEC_PAIR_WEP104,
            "pair_tkip" => SEC_PAIR_TKIP,
            "pair_ccmp" => SEC_PAIR_CCMP,
            "group_wep40" => SEC_GROUP_WEP40,
            "group_wep104" => SEC_GROUP_WEP104,
            "group_tkip" => SEC_GROUP_TKIP,
            "group_ccmp" => SEC_GROUP_CCMP,
            "psk" => SEC_KEY_MGMT_PSK,
            "802.1X" => SEC_KEY_MGMT_802_1X,
            "sae" => SEC_KEY_MGMT_SAE,
            "owe" => SEC_KEY_MGMT_OWE,
            "owe_transition_mode" => SEC_KEY_MGMT_OWE_TM,
            "eap_suite_b_192" => SEC_KEY_MGMT_EAP_SUITE_B_192,
            _ => {
                tracing::trace!("Unrecognised security flag token: {}", token);
                0
            }
        };
        acc | bit
    })
}
