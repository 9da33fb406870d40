use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use campusbook::desk::BookingDesk;
use campusbook::engine::{EngineConfig, LifecycleService};
use campusbook::model::{Booking, MINUTE, Ms};
use campusbook::notify::NotifyHub;
use campusbook::reaper;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn read_snapshot(path: Option<&str>) -> Result<Vec<Booking>, Box<dyn std::error::Error>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

async fn shutdown_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let metrics_port: Option<u16> = env_parse("CAMPUSBOOK_METRICS_PORT");
    campusbook::observability::init(metrics_port)?;

    let auto_confirm: bool = env_parse("CAMPUSBOOK_AUTO_CONFIRM").unwrap_or(true);
    let slot_minutes: Ms = env_parse("CAMPUSBOOK_SLOT_MINUTES").unwrap_or(30);
    let snapshot = std::env::var("CAMPUSBOOK_SNAPSHOT").ok();
    let now: Ms = env_parse("CAMPUSBOOK_NOW_MS").unwrap_or_else(reaper::wall_clock_ms);
    let sweep_every: Option<u64> = env_parse("CAMPUSBOOK_SWEEP_INTERVAL_SECS");
    let reminder_minutes: Ms = env_parse("CAMPUSBOOK_REMINDER_MINUTES").unwrap_or(60);

    let service = LifecycleService::new(EngineConfig {
        auto_confirm,
        slot_granularity: slot_minutes.saturating_mul(MINUTE),
        reminder_lead: reminder_minutes.saturating_mul(MINUTE),
    });
    let desk = Arc::new(BookingDesk::new(service, Arc::new(NotifyHub::new())));

    let Some(secs) = sweep_every else {
        // One-shot: sweep the snapshot and print the outcomes.
        let loaded = desk.load(read_snapshot(snapshot.as_deref())?).await?;
        info!("sweeping {loaded} bookings at {now}");
        for outcome in desk.sweep(now).await {
            println!("{}", serde_json::to_string(&outcome)?);
        }
        for reminder in desk.remind(now).await {
            println!("{}", serde_json::to_string(&reminder)?);
        }
        return Ok(());
    };

    // Daemon mode never blocks on stdin.
    if let Some(path) = snapshot.as_deref() {
        desk.load(read_snapshot(Some(path))?).await?;
    }
    info!("campusbook sweeping every {secs}s");
    info!("  auto_confirm: {auto_confirm}");
    info!("  slot_minutes: {slot_minutes}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let sweeper = tokio::spawn(reaper::run_sweeper(
        desk.clone(),
        Duration::from_secs(secs.max(1)),
    ));
    if let Err(e) = shutdown_signal().await {
        warn!("signal handler failed: {e}");
    }
    info!("shutdown signal received, stopping sweeper");
    sweeper.abort();

    info!("campusbook stopped");
    Ok(())
}
