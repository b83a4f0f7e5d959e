//! gpsd client.
//!
//! Connects to a gpsd daemon over TCP, enables JSON watch mode and forwards
//! every TPV report that carries a 2D or 3D fix.

use super::{PositionFix, PositionProvider};
use crate::error::PositionError;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_GPSD_ADDR: &str = "127.0.0.1:2947";

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true}\n";

/// Subset of a gpsd report we care about
#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    eph: Option<f64>,
}

pub struct GpsdProvider {
    addr: String,
    reader: Option<JoinHandle<()>>,
}

impl GpsdProvider {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            reader: None,
        }
    }
}

impl Default for GpsdProvider {
    fn default() -> Self {
        Self::new(DEFAULT_GPSD_ADDR)
    }
}

#[async_trait]
impl PositionProvider for GpsdProvider {
    fn name(&self) -> &str {
        "gpsd"
    }

    async fn subscribe(&mut self, sink: mpsc::Sender<PositionFix>) -> Result<(), PositionError> {
        self.unsubscribe().await;

        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| PositionError::Unavailable(format!("cannot reach gpsd at {}: {}", self.addr, e)))?;

        stream
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| PositionError::Protocol(format!("failed to enable watch mode: {}", e)))?;

        tracing::debug!("Connected to gpsd at {}", self.addr);

        let addr = self.addr.clone();
        self.reader = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(fix) = parse_report(&line) else {
                            continue;
                        };
                        if sink.send(fix).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::warn!("gpsd at {} closed the connection", addr);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Error reading from gpsd at {}: {}", addr, e);
                        break;
                    }
                }
            }
            // Dropping the sink ends the tracker's stream
        }));

        Ok(())
    }

    async fn unsubscribe(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for GpsdProvider {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Turn one line of gpsd output into a fix.
///
/// Non-TPV classes, reports without a fix (mode < 2) and lines that are not
/// valid JSON yield `None`.
fn parse_report(line: &str) -> Option<PositionFix> {
    let report: Report = match serde_json::from_str(line.trim()) {
        Ok(report) => report,
        Err(e) => {
            tracing::trace!("Skipping unparseable gpsd line: {}", e);
            return None;
        }
    };

    if report.class != "TPV" || report.mode < 2 {
        return None;
    }

    let accuracy_meters = match (report.epx, report.epy) {
        (Some(x), Some(y)) => x.max(y),
        (Some(x), None) => x,
        (None, Some(y)) => y,
        (None, None) => report.eph.unwrap_or(0.0),
    };

    Some(PositionFix {
        latitude: report.lat?,
        longitude: report.lon?,
        accuracy_meters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_tpv_with_error_estimates() {
        let line = r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"lat":51.5007,"lon":-0.1246,"epx":4.5,"epy":7.25}"#;
        let fix = parse_report(line).unwrap();
        assert_eq!(fix.latitude, 51.5007);
        assert_eq!(fix.longitude, -0.1246);
        assert_eq!(fix.accuracy_meters, 7.25);
    }

    #[test]
    fn test_parse_falls_back_to_eph() {
        let line = r#"{"class":"TPV","mode":2,"lat":1.0,"lon":2.0,"eph":11.0}"#;
        assert_eq!(parse_report(line).unwrap().accuracy_meters, 11.0);

        let line = r#"{"class":"TPV","mode":2,"lat":1.0,"lon":2.0}"#;
        assert_eq!(parse_report(line).unwrap().accuracy_meters, 0.0);
    }

    #[test]
    fn test_parse_skips_non_fix_reports() {
        assert!(parse_report(r#"{"class":"VERSION","release":"3.25"}"#).is_none());
        assert!(parse_report(r#"{"class":"TPV","mode":1}"#).is_none());
        assert!(parse_report(r#"{"class":"TPV","mode":3,"lat":1.0}"#).is_none());
        assert!(parse_report("not json").is_none());
    }

    #[tokio::test]
    async fn test_subscribe_streams_fixes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            let watch = lines.next_line().await.unwrap().unwrap();
            assert!(watch.starts_with("?WATCH="));
            write
                .write_all(b"{\"class\":\"VERSION\"}\n{\"class\":\"TPV\",\"mode\":3,\"lat\":10.0,\"lon\":20.0,\"eph\":3.0}\n")
                .await
                .unwrap();
        });

        let mut provider = GpsdProvider::new(addr.to_string());
        let (tx, mut rx) = mpsc::channel(4);
        provider.subscribe(tx).await.unwrap();

        let fix = rx.recv().await.unwrap();
        assert_eq!(fix.latitude, 10.0);
        assert_eq!(fix.accuracy_meters, 3.0);

        server.await.unwrap();
        // Server hung up, so the stream ends
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut provider = GpsdProvider::new(addr.to_string());
        let (tx, _rx) = mpsc::channel(1);
        let err = provider.subscribe(tx).await.unwrap_err();
        assert!(matches!(err, PositionError::Unavailable(_)));
    }
}
