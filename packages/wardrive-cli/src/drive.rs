//! Drive mode: continuous scanning with position tracking
//!
//! This module implements the long-running session that:
//! - Scans every interface on the configured interval
//! - Geotags networks with the latest position fix
//! - Handles graceful shutdown via SIGTERM/SIGINT or a duration limit
//! - Exports the session when it ends

use crate::{Cli, OutputFormat, print_network_table};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use wardrive_core::{ExportFormat, Statistics, WardriveEvent, Wardriver, config};

/// Run a wardriving session until interrupted
pub async fn run_drive(
    cli: &Cli,
    duration_secs: Option<u64>,
    formats: Vec<ExportFormat>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let settings = config::load_settings();
    let output_dir = output_dir.unwrap_or_else(|| settings.export_dir.value.clone());

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create export directory {}", output_dir.display()))?;

    let mut session = Wardriver::from_settings(&settings);
    let mut events = session.subscribe();

    if !session.start().await {
        anyhow::bail!("Wireless subsystem unavailable (is NetworkManager running?)");
    }

    tracing::info!(
        "Driving: scanning every {} ms, location from {}, exports to {}",
        settings.scan_interval_ms.value,
        settings.location_backend.value,
        output_dir.display()
    );

    let cancel = CancellationToken::new();
    setup_signal_handlers(cancel.clone());

    if let Some(secs) = duration_secs {
        let timer = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::info!("Duration of {}s reached", secs);
            timer.cancel();
        });
    }

    // Surface discoveries as they happen
    let print_discoveries = matches!(cli.format, OutputFormat::Text);
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(WardriveEvent::NetworkDiscovered { bssid, ssid }) if print_discoveries => {
                    println!("  + {} {}", bssid, ssid);
                }
                Ok(WardriveEvent::PositionError { message }) => {
                    tracing::warn!("Location: {}", message);
                }
                Ok(WardriveEvent::ScanError { message }) => {
                    tracing::warn!("Scan: {}", message);
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Event printer lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    session.run_until_cancelled(cancel).await;
    printer.abort();

    let statistics = session.statistics();
    let mut written = Vec::new();
    for format in &formats {
        let path = output_dir.join(format.default_file_name());
        match session.export(*format, &path) {
            Ok(()) => written.push(path),
            Err(e) => {
                tracing::error!("Export to {} failed: {}", format, e);
                eprintln!("Export failed: {}. Retry with a different --output-dir.", e);
            }
        }
    }

    match cli.format {
        OutputFormat::Text => {
            println!();
            print_statistics(&statistics);
            if statistics.total_networks > 0 && statistics.total_networks <= 40 {
                println!();
                let mut networks = session.aggregator().all();
                networks.sort_by(|a, b| b.signal_strength.cmp(&a.signal_strength));
                print_network_table(&networks);
            }
            println!();
            for path in &written {
                println!("Wrote {}", path.display());
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "statistics": statistics,
                    "exports": written,
                })
            );
        }
    }

    tracing::info!("Drive stopped");
    Ok(())
}

fn print_statistics(stats: &Statistics) {
    println!("Session summary");
    println!("===============");
    println!("Duration:            {:.0}s", stats.scan_duration().as_secs_f64());
    println!("Networks:            {}", stats.total_networks);
    println!("  Open:              {}", stats.open_networks);
    println!("  WEP:               {}", stats.wep_networks);
    println!("  WPA family:        {}", stats.wpa_networks);
    println!("  Unknown:           {}", stats.unknown_networks);
    println!("With position:       {}", stats.networks_with_position);
    println!("Positions recorded:  {}", stats.locations_recorded);
}

/// Set up SIGTERM and SIGINT handlers for graceful shutdown
fn setup_signal_handlers(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        for (kind, name) in [
            (SignalKind::terminate(), "SIGTERM"),
            (SignalKind::interrupt(), "SIGINT"),
        ] {
            let cancel = cancel.clone();
            match signal(kind) {
                Ok(mut stream) => {
                    tokio::spawn(async move {
                        stream.recv().await;
                        tracing::info!("Received {}", name);
                        cancel.cancel();
                    });
                }
                Err(e) => tracing::warn!("Failed to register {} handler: {}", name, e),
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down");
                cancel.cancel();
            }
        });
    }
}
