//! Session export.
//!
//! Each format is a pure function from a [`Snapshot`] to bytes; exporting the
//! same snapshot twice yields identical output. Records keep discovery order.

pub mod csv;
pub mod gpx;
pub mod kml;

use crate::aggregator::Snapshot;
use crate::error::ExportError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Base name for export files
pub const DEFAULT_FILE_STEM: &str = "wardrive_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One row per network
    Csv,
    /// Placemarks for mapping viewers
    Kml,
    /// Waypoints plus the movement track
    Gpx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Kml, ExportFormat::Gpx];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Kml => "kml",
            ExportFormat::Gpx => "gpx",
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("{}.{}", DEFAULT_FILE_STEM, self.extension())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "kml" => Ok(ExportFormat::Kml),
            "gpx" => Ok(ExportFormat::Gpx),
            other => Err(format!("unknown export format '{}' (expected csv, kml or gpx)", other)),
        }
    }
}

/// Serialize a snapshot into the given format.
pub fn render(snapshot: &Snapshot, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => csv::render(snapshot),
        ExportFormat::Kml => kml::render(snapshot).map(String::into_bytes),
        ExportFormat::Gpx => gpx::render(snapshot).map(String::into_bytes),
    }
}

/// Render and write a snapshot to `path`, replacing any existing file.
///
/// The parent directory must exist. On error the file may be partially
/// written and should not be trusted.
pub fn export_to_path(snapshot: &Snapshot, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    let bytes = render(snapshot, format)?;
    fs::write(path, &bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        "Exported {} networks to {} ({} bytes)",
        snapshot.networks.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Escape text for XML element content and attribute values.
///
/// Characters XML 1.0 cannot carry at all (most C0 controls, U+FFFE, U+FFFF)
/// are dropped. SSIDs are raw bytes and may contain them.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if is_xml_char(c) => escaped.push(c),
            _ => {}
        }
    }
    escaped
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// `YYYY-MM-DDTHH:MM:SSZ`
pub(crate) fn utc_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::aggregator::{Aggregator, NetworkRecord, PositionSample, Snapshot};
    use crate::radio::fake::access_point;
    use chrono::{DateTime, TimeZone, Utc};

    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// Two located networks, one without a position, three track points.
    pub fn snapshot() -> Snapshot {
        let mut aggregator = Aggregator::new();
        let fix = PositionSample::new(37.7749, -122.4194, 12.5, at(0));

        let cafe = NetworkRecord::from_access_point(
            &access_point("aa:bb:cc:00:00:01", "Cafe <Free> & \"Fast\"", -48, 2437),
            "wlan0",
            at(1),
        );
        aggregator.merge_at(cafe, Some(&fix), at(1));

        let hidden = NetworkRecord::from_access_point(
            &access_point("aa:bb:cc:00:00:02", "", -71, 5180),
            "wlan0",
            at(2),
        );
        aggregator.merge_at(hidden, None, at(2));

        let office = NetworkRecord::from_access_point(
            &access_point("aa:bb:cc:00:00:03", "Office", -60, 5955),
            "wlan1",
            at(3),
        );
        let later = PositionSample::new(37.7755, -122.4180, 4.0, at(3));
        aggregator.merge_at(office, Some(&later), at(3));

        aggregator.record_position(fix);
        aggregator.record_position(PositionSample::new(37.7752, -122.4187, 6.0, at(2)));
        aggregator.record_position(later);

        aggregator.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(ExportFormat::Kml.default_file_name(), "wardrive_data.kml");
        assert_eq!("GPX".parse::<ExportFormat>().unwrap(), ExportFormat::Gpx);
        assert!("shp".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let snapshot = fixtures::snapshot();
        for format in ExportFormat::ALL {
            let first = render(&snapshot, format).unwrap();
            let second = render(&snapshot, format).unwrap();
            assert_eq!(first, second, "{} output differs", format);
        }
    }

    #[test]
    fn test_export_to_path_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = fixtures::snapshot();

        for format in ExportFormat::ALL {
            let path = dir.path().join(format.default_file_name());
            export_to_path(&snapshot, format, &path).unwrap();
            assert_eq!(fs::read(&path).unwrap(), render(&snapshot, format).unwrap());
        }
    }

    #[test]
    fn test_export_to_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"").unwrap();
        let path = blocker.join("wardrive_data.csv");

        let err = export_to_path(&fixtures::snapshot(), ExportFormat::Csv, &path).unwrap_err();
        match err {
            ExportError::Io { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml("Caf\u{e9} \u{1F4F6}"), "Caf\u{e9} \u{1F4F6}");
    }

    #[test]
    fn test_escape_xml_drops_forbidden_characters() {
        assert_eq!(escape_xml("bad\u{1}name"), "badname");
        assert_eq!(escape_xml("\u{0}\u{8}\u{b}\u{1f}x\u{fffe}\u{ffff}"), "x");
        assert_eq!(escape_xml("tab\there"), "tab\there");
    }
}
