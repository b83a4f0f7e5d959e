//! Frequency to channel mapping for the 2.4, 5 and 6 GHz bands.

/// Derive the IEEE 802.11 channel number from a centre frequency in MHz.
///
/// Returns `0` for frequencies outside every known band.
pub fn frequency_to_channel(frequency_mhz: u32) -> u32 {
    match frequency_mhz {
        2484 => 14,
        2412..=2483 => (frequency_mhz - 2412) / 5 + 1,
        5170..=5825 => (frequency_mhz - 5000) / 5,
        // 6 GHz channel n is centred on 5950 + 5n, so 5955 is channel 1
        5955..=7125 => (frequency_mhz - 5950) / 5,
        _ => 0,
    }
}
