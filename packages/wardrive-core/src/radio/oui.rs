//! BSSID helpers: canonical formatting and OUI vendor lookup
//!
//! Uses the IEEE OUI database to identify access point manufacturers.

/// Canonical form of a BSSID used as the dedup key.
///
/// Upper-cases hex digits and turns `-` separators into `:`. Other content is
/// preserved so identifiers that are not MAC addresses still round-trip.
pub fn canonical_bssid(bssid: &str) -> String {
    bssid.trim().replace('-', ":").to_uppercase()
}

/// Lookup the vendor/manufacturer name for a BSSID.
///
/// # Returns
/// * `Some(vendor_name)` if found in the OUI database
/// * `Some("Randomized (locally administered)")` for locally administered addresses
/// * `None` if the address is invalid or not found
pub fn lookup_vendor(bssid: &str) -> Option<String> {
    let normalized = normalize_mac(bssid)?;

    if is_locally_administered(&normalized) {
        return Some("Randomized (locally administered)".to_string());
    }

    match oui_data::lookup(&normalized) {
        Some(record) => {
            let vendor_name = record.organization().to_string();
            tracing::trace!("OUI lookup for {}: {}", bssid, vendor_name);
            Some(vendor_name)
        }
        None => {
            tracing::trace!("OUI lookup for {}: not found", bssid);
            None
        }
    }
}

/// Whether the U/L bit of the first octet marks the address as locally assigned.
///
/// Mobile hotspots and mesh satellites commonly use these.
pub fn is_locally_administered(mac: &str) -> bool {
    normalize_mac(mac)
        .and_then(|m| u8::from_str_radix(&m[0..2], 16).ok())
        .map(|first| first & 0x02 != 0)
        .unwrap_or(false)
}

/// Normalize a MAC address to the format XX:XX:XX:XX:XX:XX
fn normalize_mac(mac: &str) -> Option<String> {
    let cleaned: String = mac.replace([':', '-', '.'], "").to_uppercase();

    if cleaned.len() != 12 || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    Some(format!(
        "{}:{}:{}:{}:{}:{}",
        &cleaned[0..2],
        &cleaned[2..4],
        &cleaned[4..6],
        &cleaned[6..8],
        &cleaned[8..10],
        &cleaned[10..12]
    ))
}
