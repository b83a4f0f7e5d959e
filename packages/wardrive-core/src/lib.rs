//! Wardrive Core Library
//!
//! This crate provides the core functionality for wardriving agents:
//! - Radio observation (NetworkManager backend, channel and security derivation)
//! - Position tracking (gpsd or a fixed location)
//! - Session aggregation (one record per BSSID, strongest signal wins)
//! - Export to CSV, KML and GPX
//!
//! # Example
//!
//! ```no_run
//! use wardrive_core::{ExportFormat, Wardriver, config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = config::load_settings();
//!     let mut session = Wardriver::from_settings(&settings);
//!
//!     // Passive monitoring continues even if active scans are refused
//!     session.start().await;
//!
//!     let cancel = CancellationToken::new();
//!     let stop = cancel.clone();
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         stop.cancel();
//!     });
//!     session.run_until_cancelled(cancel).await;
//!
//!     println!("Found {} networks", session.aggregator().count());
//!     session.export(ExportFormat::Kml, std::path::Path::new("wardrive_data.kml"))?;
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod location;
pub mod radio;
pub mod scan_loop;
pub mod session;

// Re-export commonly used types
pub use aggregator::{Aggregator, MergeOutcome, NetworkRecord, Position, PositionSample, Snapshot, Statistics};
pub use config::{ConfigSource, Settings};
pub use error::{ConfigError, ExportError, PositionError, RadioError};
pub use events::{EventBus, WardriveEvent};
pub use export::ExportFormat;
pub use location::{PositionFix, PositionProvider, PositionTracker};
pub use radio::{RadioInterface, RadioProvider, RawAccessPoint, ScanCapabilities, ScanMode, Security};
pub use scan_loop::{ScanLoop, TickReport};
pub use session::{Step, Wardriver};
