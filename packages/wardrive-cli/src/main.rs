//! Wardrive CLI - headless wardriving agent for Linux
//!
//! This binary provides a minimal footprint agent that can:
//! - List wireless interfaces and whether active scans are permitted
//! - Take a one-off snapshot of visible access points
//! - Drive: scan continuously, geotag networks, export CSV/KML/GPX on exit

mod drive;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use wardrive_core::radio::{ScanRequestOutcome, privileges};
use wardrive_core::{Aggregator, EventBus, ExportFormat, NetworkRecord, ScanCapabilities, ScanLoop, config};

#[derive(Parser)]
#[command(name = "wardrive")]
#[command(author = "Wardrive Contributors")]
#[command(version)]
#[command(about = "Headless wardriving agent for Linux")]
#[command(long_about = "
Wardrive observes nearby Wi-Fi access points through NetworkManager, tags
them with positions from gpsd and exports the session as CSV, KML or GPX.

Quick start:
  1. Check radios:      wardrive interfaces
  2. One-off snapshot:  wardrive scan
  3. Start driving:     wardrive drive --export kml --export gpx

Press Ctrl+C to stop driving; exports are written on exit.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List wireless interfaces and scan capabilities
    Interfaces,

    /// Poll every interface once and print visible networks
    Scan {
        /// Seconds to wait for active scan results before reading
        #[arg(short, long, default_value = "2")]
        wait: u64,
    },

    /// Scan continuously until interrupted, then export the session
    Drive {
        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Export format, repeatable (csv, kml, gpx). Defaults to all three.
        #[arg(short, long = "export", value_parser = parse_export_format)]
        export: Vec<ExportFormat>,

        /// Directory for export files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show configuration paths and settings
    Config,
}

fn parse_export_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wardrive={},wardrive_core={}", log_level, log_level).into()),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Interfaces => cmd_interfaces(&cli).await,
        Commands::Scan { wait } => cmd_scan(&cli, *wait).await,
        Commands::Drive {
            duration,
            export,
            output_dir,
        } => {
            let formats = if export.is_empty() {
                ExportFormat::ALL.to_vec()
            } else {
                export.clone()
            };
            drive::run_drive(&cli, *duration, formats, output_dir.clone()).await
        }
        Commands::Config => cmd_config(&cli).await,
    }
}

async fn cmd_interfaces(cli: &Cli) -> Result<()> {
    let settings = config::load_settings();
    let radio = settings.radio_provider();
    let interfaces = radio.list_interfaces().await?;

    let mut capabilities = ScanCapabilities::default();
    for interface in &interfaces {
        let result = radio.request_scan(interface).await;
        let outcome = ScanRequestOutcome::from_result(&result);
        if let (Err(e), ScanRequestOutcome::Failed) = (&result, outcome) {
            tracing::warn!("Scan request on {} failed: {}", interface.name, e);
        }
        capabilities.record(&interface.name, outcome);
    }

    match cli.format {
        OutputFormat::Text => {
            if interfaces.is_empty() {
                println!("No wireless interfaces found.");
                return Ok(());
            }
            println!("Wireless interfaces:");
            for interface in &interfaces {
                let mode = if capabilities.active_interfaces.contains(&interface.name) {
                    "active"
                } else {
                    "passive"
                };
                println!(
                    "  {:12} {:14} {}",
                    interface.name,
                    interface.state.as_deref().unwrap_or("-"),
                    mode
                );
            }
            println!();
            println!("{}", privileges::format_capabilities_message(&capabilities));
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "interfaces": interfaces,
                    "capabilities": capabilities,
                })
            );
        }
    }

    Ok(())
}

async fn cmd_scan(cli: &Cli, wait_secs: u64) -> Result<()> {
    let settings = config::load_settings();
    let mut scans = ScanLoop::new(settings.radio_provider(), EventBus::new());

    if !scans.start().await {
        anyhow::bail!("Wireless subsystem unavailable (is NetworkManager running?)");
    }

    match cli.format {
        OutputFormat::Text => println!("Scanning..."),
        OutputFormat::Json => {}
    }
    tokio::time::sleep(Duration::from_secs(wait_secs)).await;

    let mut aggregator = Aggregator::new();
    let report = scans.tick(&mut aggregator, None).await;
    let capabilities = scans.capabilities().clone();
    scans.stop();

    let mut networks = aggregator.all();
    networks.sort_by(|a, b| b.signal_strength.cmp(&a.signal_strength));

    match cli.format {
        OutputFormat::Text => {
            println!();
            println!("Found {} networks ({} scan):", networks.len(), capabilities.mode);
            println!();
            print_network_table(&networks);
            for interface in &report.failed_interfaces {
                eprintln!("Warning: could not read {}", interface);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "networks": networks,
                    "mode": capabilities.mode,
                    "failed_interfaces": report.failed_interfaces,
                })
            );
        }
    }

    Ok(())
}

pub(crate) fn print_network_table(networks: &[NetworkRecord]) {
    println!(
        "  {:17} {:>6} {:>4}  {:9} {:32} {}",
        "BSSID", "SIGNAL", "CH", "SECURITY", "SSID", "VENDOR"
    );
    for network in networks {
        let channel = match network.channel {
            0 => "-".to_string(),
            c => c.to_string(),
        };
        println!(
            "  {:17} {:>6} {:>4}  {:9} {:32} {}",
            network.bssid,
            network.signal_strength,
            channel,
            network.security.as_str(),
            network.ssid,
            network.vendor.as_deref().unwrap_or("")
        );
    }
}

async fn cmd_config(cli: &Cli) -> Result<()> {
    let settings = config::load_settings();
    let config_path = config::get_config_file_path_string();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            println!(
                "Scan interval:    {} ms (from {})",
                settings.scan_interval_ms.value, settings.scan_interval_ms.source
            );
            println!("Radio backend:    nmcli");
            println!(
                "Location backend: {} (from {})",
                settings.location_backend.value, settings.location_backend.source
            );
            println!(
                "gpsd address:     {} (from {})",
                settings.gpsd_addr.value, settings.gpsd_addr.source
            );
            if let Some(fixed) = settings.fixed_position {
                println!(
                    "Fixed position:   {:.6}, {:.6} (±{}m)",
                    fixed.latitude, fixed.longitude, fixed.accuracy_meters
                );
            }
            println!(
                "Export directory: {} (from {})",
                settings.export_dir.value.display(),
                settings.export_dir.source
            );
            println!();
            println!("Environment variables:");
            println!("  WARDRIVE_SCAN_INTERVAL_MS - Override scan interval");
            println!("  WARDRIVE_GPSD_ADDR        - Override gpsd address");
            println!("  WARDRIVE_EXPORT_DIR       - Override export directory");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "settings": settings,
                })
            );
        }
    }

    Ok(())
}
