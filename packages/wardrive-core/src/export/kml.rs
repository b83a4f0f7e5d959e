//! KML 2.2 export for Google Earth and similar viewers.
//!
//! Only networks with a position become placemarks. Placemarks are styled by
//! security into four pushpin colours.

use super::{escape_xml, utc_timestamp};
use crate::aggregator::{NetworkRecord, Position, Snapshot};
use crate::error::ExportError;
use crate::radio::Security;
use std::fmt::Write;

const PUSHPIN_BASE: &str = "http://maps.google.com/mapfiles/kml/pushpin";

/// Marker bucket for a security class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleBucket {
    Open,
    Wep,
    Wpa,
    Unknown,
}

impl StyleBucket {
    const ALL: [StyleBucket; 4] = [StyleBucket::Open, StyleBucket::Wep, StyleBucket::Wpa, StyleBucket::Unknown];

    pub fn for_security(security: Security) -> Self {
        match security {
            Security::Open => StyleBucket::Open,
            Security::Wep => StyleBucket::Wep,
            s if s.is_wpa_family() => StyleBucket::Wpa,
            _ => StyleBucket::Unknown,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            StyleBucket::Open => "open_style",
            StyleBucket::Wep => "wep_style",
            StyleBucket::Wpa => "wpa_style",
            StyleBucket::Unknown => "unknown_style",
        }
    }

    /// KML `aabbggrr` colour
    fn color(&self) -> &'static str {
        match self {
            StyleBucket::Open => "ff0000ff",
            StyleBucket::Wep => "ff0080ff",
            StyleBucket::Wpa => "ff00ff00",
            StyleBucket::Unknown => "ff00ffff",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            StyleBucket::Open => "red-pushpin.png",
            StyleBucket::Wep => "orange-pushpin.png",
            StyleBucket::Wpa => "grn-pushpin.png",
            StyleBucket::Unknown => "ylw-pushpin.png",
        }
    }
}

pub fn render(snapshot: &Snapshot) -> Result<String, ExportError> {
    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#)?;
    writeln!(out, "  <Document>")?;
    writeln!(out, "    <name>WiFi Wardriving Data</name>")?;
    writeln!(
        out,
        "    <description>WiFi networks found during wardriving session. Total networks: {}</description>",
        snapshot.networks.len()
    )?;

    for bucket in StyleBucket::ALL {
        write_style(&mut out, bucket)?;
    }

    for (network, position) in snapshot.located_networks() {
        write_placemark(&mut out, network, position)?;
    }

    writeln!(out, "  </Document>")?;
    writeln!(out, "</kml>")?;
    Ok(out)
}

fn write_style(out: &mut String, bucket: StyleBucket) -> std::fmt::Result {
    writeln!(out, r#"    <Style id="{}">"#, bucket.id())?;
    writeln!(out, "      <IconStyle>")?;
    writeln!(out, "        <color>{}</color>", bucket.color())?;
    writeln!(out, "        <Icon>")?;
    writeln!(out, "          <href>{}/{}</href>", PUSHPIN_BASE, bucket.icon())?;
    writeln!(out, "        </Icon>")?;
    writeln!(out, "      </IconStyle>")?;
    writeln!(out, "    </Style>")
}

fn write_placemark(out: &mut String, network: &NetworkRecord, position: Position) -> std::fmt::Result {
    writeln!(out, "    <Placemark>")?;
    writeln!(out, "      <name>{}</name>", escape_xml(&network.ssid))?;
    writeln!(out, "      <description><![CDATA[{}]]></description>", description(network, position))?;
    writeln!(
        out,
        "      <styleUrl>#{}</styleUrl>",
        StyleBucket::for_security(network.security).id()
    )?;
    writeln!(out, "      <TimeStamp><when>{}</when></TimeStamp>", utc_timestamp(&network.observed_at))?;
    writeln!(out, "      <Point>")?;
    writeln!(out, "        <coordinates>{},{},0</coordinates>", position.longitude, position.latitude)?;
    writeln!(out, "      </Point>")?;
    writeln!(out, "    </Placemark>")
}

/// HTML block shown in the viewer's balloon. Escaped, so it cannot close the CDATA section.
fn description(network: &NetworkRecord, position: Position) -> String {
    let unknown = || "Unknown".to_string();
    let mut lines = vec![
        format!("<b>SSID:</b> {}", escape_xml(&network.ssid)),
        format!("<b>BSSID:</b> {}", network.bssid),
        format!("<b>Security:</b> {}", network.security),
        format!("<b>Signal Strength:</b> {} dBm", network.signal_strength),
        format!(
            "<b>Frequency:</b> {} MHz",
            network.frequency_mhz.map(|f| f.to_string()).unwrap_or_else(unknown)
        ),
        format!(
            "<b>Channel:</b> {}",
            Some(network.channel)
                .filter(|&c| c != 0)
                .map(|c| c.to_string())
                .unwrap_or_else(unknown)
        ),
    ];
    if let Some(vendor) = &network.vendor {
        lines.push(format!("<b>Vendor:</b> {}", escape_xml(vendor)));
    }
    lines.push(format!(
        "<b>First Seen:</b> {}",
        network.first_seen_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!("<b>Accuracy:</b> ±{}m", position.accuracy_meters));
    lines.join("<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    #[test]
    fn test_placemarks_only_for_located_networks() {
        let snapshot = fixtures::snapshot();
        let kml = render(&snapshot).unwrap();

        assert_eq!(kml.matches("<Placemark>").count(), 2);
        assert!(!kml.contains("AA:BB:CC:00:00:02"));
        for (network, _) in snapshot.located_networks() {
            assert_eq!(kml.matches(&format!("<b>BSSID:</b> {}<br/>", network.bssid)).count(), 1);
        }
        assert!(kml.contains("Total networks: 3</description>"));
    }

    #[test]
    fn test_coordinates_are_lon_lat() {
        let kml = render(&fixtures::snapshot()).unwrap();
        assert!(kml.contains("<coordinates>-122.4194,37.7749,0</coordinates>"));
    }

    #[test]
    fn test_names_are_escaped() {
        let kml = render(&fixtures::snapshot()).unwrap();
        assert!(kml.contains("<name>Cafe &lt;Free&gt; &amp; &quot;Fast&quot;</name>"));
        assert_eq!(kml.matches("]]>").count(), 2);
    }

    #[test]
    fn test_control_characters_are_dropped() {
        use crate::aggregator::{Aggregator, NetworkRecord, PositionSample};
        use crate::radio::fake::access_point;

        let mut aggregator = Aggregator::new();
        let fix = PositionSample::new(51.5, -0.12, 8.0, fixtures::at(0));
        let record = NetworkRecord::from_access_point(
            &access_point("aa:bb:cc:00:00:09", "bad\u{1}name", -50, 2412),
            "wlan0",
            fixtures::at(1),
        );
        aggregator.merge_at(record, Some(&fix), fixtures::at(1));

        let kml = render(&aggregator.snapshot()).unwrap();
        assert!(!kml.contains('\u{1}'));
        assert!(kml.contains("<name>badname</name>"));
        assert!(kml.contains("<b>SSID:</b> badname"));
    }

    #[test]
    fn test_style_buckets() {
        assert_eq!(StyleBucket::for_security(Security::Open).id(), "open_style");
        assert_eq!(StyleBucket::for_security(Security::Wep).id(), "wep_style");
        for s in [Security::Wpa, Security::Wpa2, Security::Wpa3, Security::WpaWpa2] {
            assert_eq!(StyleBucket::for_security(s), StyleBucket::Wpa);
        }
        assert_eq!(StyleBucket::for_security(Security::Unknown), StyleBucket::Unknown);

        let kml = render(&fixtures::snapshot()).unwrap();
        for bucket in StyleBucket::ALL {
            assert!(kml.contains(&format!(r#"<Style id="{}">"#, bucket.id())));
        }
    }
}
