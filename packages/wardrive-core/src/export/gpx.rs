//! GPX 1.1 export: a waypoint per located network plus the movement track.

use super::{escape_xml, utc_timestamp};
use crate::aggregator::Snapshot;
use crate::error::ExportError;
use std::fmt::Write;

pub fn render(snapshot: &Snapshot) -> Result<String, ExportError> {
    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<gpx version="1.1" creator="wardrive" xmlns="http://www.topografix.com/GPX/1/1">"#
    )?;
    writeln!(out, "  <metadata>")?;
    writeln!(out, "    <name>WiFi Wardriving Session</name>")?;
    writeln!(
        out,
        "    <desc>WiFi networks found during wardriving. Total: {}</desc>",
        snapshot.networks.len()
    )?;
    writeln!(out, "  </metadata>")?;

    for (network, position) in snapshot.located_networks() {
        writeln!(out, r#"  <wpt lat="{}" lon="{}">"#, position.latitude, position.longitude)?;
        writeln!(out, "    <time>{}</time>", utc_timestamp(&network.observed_at))?;
        writeln!(out, "    <name>{}</name>", escape_xml(&network.ssid))?;
        writeln!(
            out,
            "    <desc>BSSID: {}, Security: {}, Signal: {} dBm</desc>",
            network.bssid, network.security, network.signal_strength
        )?;
        writeln!(out, "  </wpt>")?;
    }

    if !snapshot.track.is_empty() {
        writeln!(out, "  <trk>")?;
        writeln!(out, "    <name>Wardriving Route</name>")?;
        writeln!(out, "    <trkseg>")?;
        for sample in &snapshot.track {
            writeln!(out, r#"      <trkpt lat="{}" lon="{}">"#, sample.latitude, sample.longitude)?;
            writeln!(out, "        <time>{}</time>", utc_timestamp(&sample.timestamp))?;
            writeln!(out, "      </trkpt>")?;
        }
        writeln!(out, "    </trkseg>")?;
        writeln!(out, "  </trk>")?;
    }

    writeln!(out, "</gpx>")?;
    Ok(out)
}
