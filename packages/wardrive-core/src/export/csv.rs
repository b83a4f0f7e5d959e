//! Tabular export. Missing values are empty cells, never zero.

use crate::aggregator::Snapshot;
use crate::error::ExportError;
use chrono::{DateTime, Local, SecondsFormat, Utc};

pub const HEADERS: [&str; 13] = [
    "SSID",
    "BSSID",
    "Security",
    "Signal_Strength",
    "Frequency",
    "Channel",
    "Latitude",
    "Longitude",
    "Accuracy",
    "Timestamp",
    "Device_Interface",
    "First_Seen",
    "Last_Seen",
];

fn local_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render(snapshot: &Snapshot) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record(HEADERS)?;

        for network in &snapshot.networks {
            let position = network.position;
            wtr.write_record([
                network.ssid.clone(),
                network.bssid.clone(),
                network.security.to_string(),
                network.signal_strength.to_string(),
                cell(network.frequency_mhz),
                cell(Some(network.channel).filter(|&c| c != 0)),
                cell(position.map(|p| p.latitude)),
                cell(position.map(|p| p.longitude)),
                cell(position.map(|p| p.accuracy_meters)),
                local_timestamp(&network.observed_at),
                network.interface_name.clone(),
                local_timestamp(&network.first_seen_at),
                local_timestamp(&network.last_seen_at),
            ])?;
        }

        wtr.flush().map_err(csv::Error::from)?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    fn rows(bytes: &[u8]) -> Vec<csv::StringRecord> {
        csv::Reader::from_reader(bytes)
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_every_record_appears_once() {
        let snapshot = fixtures::snapshot();
        let bytes = render(&snapshot).unwrap();

        let header = csv::Reader::from_reader(bytes.as_slice())
            .headers()
            .unwrap()
            .clone();
        assert_eq!(header.iter().collect::<Vec<_>>(), HEADERS.to_vec());

        let rows = rows(&bytes);
        assert_eq!(rows.len(), 3);
        for network in &snapshot.networks {
            assert_eq!(rows.iter().filter(|r| &r[1] == network.bssid).count(), 1);
        }
    }

    #[test]
    fn test_missing_values_are_empty() {
        let rows = rows(&render(&fixtures::snapshot()).unwrap());
        let hidden = &rows[1];

        assert_eq!(&hidden[0], "Hidden_AA:BB:CC:00:00:02");
        assert_eq!(&hidden[4], "5180");
        assert_eq!(&hidden[5], "36");
        assert_eq!(&hidden[6], "");
        assert_eq!(&hidden[7], "");
        assert_eq!(&hidden[8], "");
    }

    #[test]
    fn test_values_and_timestamps() {
        let snapshot = fixtures::snapshot();
        let rows = rows(&render(&snapshot).unwrap());
        let cafe = &rows[0];

        assert_eq!(&cafe[0], "Cafe <Free> & \"Fast\"");
        assert_eq!(&cafe[2], "Open");
        assert_eq!(&cafe[3], "-48");
        assert_eq!(&cafe[5], "6");
        assert_eq!(&cafe[6], "37.7749");
        assert_eq!(&cafe[7], "-122.4194");
        assert_eq!(&cafe[8], "12.5");
        assert_eq!(&cafe[10], "wlan0");

        let first_seen = DateTime::parse_from_rfc3339(&cafe[11]).unwrap();
        assert_eq!(first_seen.with_timezone(&Utc), fixtures::at(1));
    }

    #[test]
    fn test_track_length_does_not_change_rows() {
        let mut snapshot = fixtures::snapshot();
        let before = rows(&render(&snapshot).unwrap()).len();
        snapshot.track.clear();
        assert_eq!(rows(&render(&snapshot).unwrap()).len(), before);
    }
}
