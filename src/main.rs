//! camwatch: console dashboard for host latency and a live camera preview
//!
//! Runs the latency sampler and the stream supervisor in the background and
//! reports what their sinks receive until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use camwatch::config::Cli;
use camwatch::latency::{LatencySample, LatencySampler, SystemPing};
use camwatch::logging::init_logging;
use camwatch::sinks::{sparkline, FrameCursor, LatestFrame, WatchChart, WatchDisplay};
use camwatch::streaming::{StreamStatus, StreamSupervisor};
use camwatch::FfmpegCapture;

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5);
const SPARKLINE_WIDTH: usize = 40;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    info!("camwatch v{} on {}", env!("CARGO_PKG_VERSION"), camwatch::platform::get_platform_name());

    // Configuration errors surface here, before any engine starts.
    let endpoint = cli.endpoint().context("Invalid camera endpoint")?;
    let profile = cli.stream_profile().context("Invalid channel selection")?;
    let url = endpoint.url(&profile);
    info!("Stream URL: {}", endpoint.redacted_url(&profile));

    if cli.no_ping && cli.no_stream {
        warn!("Both --no-ping and --no-stream given, nothing to do");
        return Ok(());
    }

    let chart = Arc::new(WatchChart::new());
    let display = Arc::new(WatchDisplay::new());

    let mut sampler = LatencySampler::new(SystemPing::new(), chart.clone(), cli.sampler_config());
    let mut supervisor = StreamSupervisor::new(
        FfmpegCapture::new(cli.ffmpeg_config()),
        display.clone(),
        cli.supervisor_config(),
    );

    let mut reporters = Vec::new();

    if !cli.no_ping {
        reporters.push(tokio::spawn(report_latency(chart.subscribe(), cli.json)));
        sampler.start(endpoint.host());
    }

    if !cli.no_stream {
        reporters.push(tokio::spawn(report_status(display.subscribe_status(), cli.json)));
        if let Some(path) = cli.snapshot.clone() {
            reporters.push(tokio::spawn(write_snapshots(display.subscribe_frames(), path)));
        }
        supervisor.start(url).await;
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    sampler.stop().await;
    supervisor.stop().await;

    let stats = supervisor.stats();
    info!(
        "Stream: {} sessions, {} open failures, {} drops, {} frames",
        stats.sessions_opened, stats.open_failures, stats.read_failures, stats.frames_displayed
    );
    let stats = sampler.stats();
    info!(
        "Ping: {} probes, {} samples, {} unavailable",
        stats.probes, stats.samples, stats.failures
    );

    for reporter in reporters {
        reporter.abort();
    }

    Ok(())
}

/// Prints the ping label and trend line for every new history snapshot.
async fn report_latency(mut history: watch::Receiver<Arc<[LatencySample]>>, json: bool) {
    while history.changed().await.is_ok() {
        let snapshot = history.borrow_and_update().clone();
        let Some(latest) = snapshot.last() else {
            continue;
        };

        if json {
            match serde_json::to_string(latest) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode sample: {}", e),
            }
        } else {
            println!("{}  {}", latest.label(), sparkline(&snapshot, SPARKLINE_WIDTH));
        }
    }
}

async fn report_status(mut status: watch::Receiver<StreamStatus>, json: bool) {
    while status.changed().await.is_ok() {
        let current = *status.borrow_and_update();
        if json {
            println!(
                "{}",
                serde_json::json!({ "status": current, "indicator": current.indicator() })
            );
        } else {
            println!("[{:?}] {}", current.indicator(), current.label());
        }
    }
}

/// Periodically saves the most recent preview frame as a PNG.
async fn write_snapshots(frames: watch::Receiver<LatestFrame>, path: PathBuf) {
    let mut interval = tokio::time::interval(SNAPSHOT_INTERVAL);
    let mut cursor = FrameCursor::default();

    loop {
        interval.tick().await;

        let Some(frame) = cursor.unseen(&frames.borrow()) else {
            continue;
        };

        let target = path.clone();
        let written = frame.clone();
        let saved = tokio::task::spawn_blocking(move || written.image.save(&target)).await;
        match saved {
            Ok(Ok(())) => cursor.mark(frame),
            Ok(Err(e)) => error!("Failed to write snapshot {}: {}", path.display(), e),
            Err(e) => warn!("Snapshot task join error: {}", e),
        }
    }
}
