//! Security classification from access point capability flags.
//!
//! Classification is two-tier. The precise tier reads the key-management bits
//! of the RSN and WPA information elements and applies a strict precedence
//! (WPA3 > WPA2 > WPA > WEP > Open). When the flags cannot be introspected the
//! coarse tier only looks at whether any security is advertised.

use serde::{Deserialize, Serialize};

/// AP advertises the privacy bit (any encryption, including WEP)
pub const AP_FLAGS_PRIVACY: u32 = 0x0001;

pub const SEC_PAIR_WEP40: u32 = 0x0001;
pub const SEC_PAIR_WEP104: u32 = 0x0002;
pub const SEC_PAIR_TKIP: u32 = 0x0004;
pub const SEC_PAIR_CCMP: u32 = 0x0008;
pub const SEC_GROUP_WEP40: u32 = 0x0010;
pub const SEC_GROUP_WEP104: u32 = 0x0020;
pub const SEC_GROUP_TKIP: u32 = 0x0040;
pub const SEC_GROUP_CCMP: u32 = 0x0080;
pub const SEC_KEY_MGMT_PSK: u32 = 0x0100;
pub const SEC_KEY_MGMT_802_1X: u32 = 0x0200;
pub const SEC_KEY_MGMT_SAE: u32 = 0x0400;
pub const SEC_KEY_MGMT_OWE: u32 = 0x0800;
pub const SEC_KEY_MGMT_OWE_TM: u32 = 0x1000;
pub const SEC_KEY_MGMT_EAP_SUITE_B_192: u32 = 0x2000;

/// Raw capability flags as reported by the radio backend.
///
/// Each field is `None` when the backend could not decode it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlags {
    pub ap_flags: Option<u32>,
    pub wpa_flags: Option<u32>,
    pub rsn_flags: Option<u32>,
}

impl CapabilityFlags {
    pub fn new(ap_flags: u32, wpa_flags: u32, rsn_flags: u32) -> Self {
        Self {
            ap_flags: Some(ap_flags),
            wpa_flags: Some(wpa_flags),
            rsn_flags: Some(rsn_flags),
        }
    }

    /// Flags for an access point advertising nothing at all.
    pub fn open() -> Self {
        Self::new(0, 0, 0)
    }

    /// Flags for a backend that exposes no capability information.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Security class of a wireless network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Security {
    Open,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WPA2")]
    Wpa2,
    #[serde(rename = "WPA3")]
    Wpa3,
    /// Produced only by the coarse tier when WPA and RSN cannot be told apart
    #[serde(rename = "WPA/WPA2")]
    WpaWpa2,
    Unknown,
}

impl Security {
    pub fn as_str(&self) -> &'static str {
        match self {
            Security::Open => "Open",
            Security::Wep => "WEP",
            Security::Wpa => "WPA",
            Security::Wpa2 => "WPA2",
            Security::Wpa3 => "WPA3",
            Security::WpaWpa2 => "WPA/WPA2",
            Security::Unknown => "Unknown",
        }
    }

    /// Any member of the WPA family, including the coarse combined label.
    pub fn is_wpa_family(&self) -> bool {
        matches!(
            self,
            Security::Wpa | Security::Wpa2 | Security::Wpa3 | Security::WpaWpa2
        )
    }
}

impl std::fmt::Display for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The flags were not fully decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagsUnavailable;

/// Classify an access point, falling back to the coarse rules when the
/// precise tier cannot read the flags.
pub fn classify(flags: &CapabilityFlags) -> Security {
    match classify_precise(flags) {
        Ok(security) => security,
        Err(FlagsUnavailable) => {
            let security = classify_coarse(flags);
            tracing::debug!(
                "Capability flags incomplete ({:?}), coarse classification: {}",
                flags,
                security
            );
            security
        }
    }
}

/// Strict precedence over fully decoded flags.
pub fn classify_precise(flags: &CapabilityFlags) -> Result<Security, FlagsUnavailable> {
    let (Some(ap), Some(wpa), Some(rsn)) = (flags.ap_flags, flags.wpa_flags, flags.rsn_flags)
    else {
        return Err(FlagsUnavailable);
    };

    let key_mgmt = SEC_KEY_MGMT_PSK | SEC_KEY_MGMT_802_1X;

    let security = if rsn & SEC_KEY_MGMT_SAE != 0 {
        Security::Wpa3
    } else if rsn & key_mgmt != 0 {
        Security::Wpa2
    } else if wpa & key_mgmt != 0 {
        Security::Wpa
    } else if ap & AP_FLAGS_PRIVACY != 0 {
        Security::Wep
    } else {
        Security::Open
    };

    Ok(security)
}

/// Presence-only rules for partially decoded flags.
///
/// Without either information element nothing can be said.
pub fn classify_coarse(flags: &CapabilityFlags) -> Security {
    if flags.wpa_flags.is_none() && flags.rsn_flags.is_none() {
        return Security::Unknown;
    }

    let wpa = flags.wpa_flags.unwrap_or(0);
    let rsn = flags.rsn_flags.unwrap_or(0);
    let ap = flags.ap_flags.unwrap_or(0);

    if wpa != 0 || rsn != 0 {
        Security::WpaWpa2
    } else if ap & AP_FLAGS_PRIVACY != 0 {
        Security::Wep
    } else {
        Security::Open
    }
}
