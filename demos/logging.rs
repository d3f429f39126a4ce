use std::{env, fs, path::Path, time::Instant};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use warroom::prelude::*;

/// Renders the dashboard with the full JSON logging pipeline installed,
/// demonstrating the observability setup.
///
/// Usage: cargo run --example logging -- <workbook.xlsx>
#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing()?;

    let path = env::args()
        .nth(1)
        .context("Pass the path to an exported workbook")?;
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {path}"))?;
    let workbook = Workbook::open(bytes)?;

    let config = DashboardConfig::default();
    let dashboard = Dashboard::new(&workbook, &config);

    let render_start = Instant::now();
    let snapshot = dashboard.snapshot(Local::now().date_naive())?;
    let render_time = render_start.elapsed();

    println!("\n--- Render Timings ---");
    println!("1. Render pass:  {render_time:?}");
    println!("2. Years found:  {}", snapshot.years.len());

    // The WorkerGuard ensures all buffered logs are flushed when dropped.
    drop(_guard);

    Ok(())
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let app_name = "warroom";

    // Detect if running in container
    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        // Container mode: log to stdout
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .init();

        info!("Logging to stdout (container mode)");
        Ok(None)
    } else {
        // Local mode: log to file
        let log_dir = Path::new("logs");
        fs::create_dir_all(log_dir)?;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        let file_name = format!("{app_name}-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .init();

        info!(log_file = %log_dir.join(file_name).display(), "Logging to file (local mode)");
        Ok(Some(guard))
    }
}
