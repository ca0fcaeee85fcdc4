//! Headless monitor for a VTHell backend: follows the live job feed, keeps
//! the auto-scheduler rules and archive tree around, and logs every change.

use std::time::Duration;

use tracing::{info, warn};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use vthell::records::{aggregate, RecordsState};
use vthell::registry::SchedulerRegistry;
use vthell::stream::EventStreamClient;
use vthell::{ApiClient, Config, FeedEvent, JobFeed};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting VTHell monitor v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let websocket_url = config.websocket_url();
    let reconnect_delay = Duration::from_secs(config.reconnect_delay_secs);
    let refresh_interval = Duration::from_secs(config.records_refresh_secs);
    let api = ApiClient::new(config.api_url, config.password)?;

    let mut scheduler = SchedulerRegistry::new();
    match api.get_auto_scheduler().await {
        Ok(rules) => {
            scheduler.add_many(rules);
            info!("Loaded {} auto-scheduler rules", scheduler.len());
        }
        Err(e) => warn!("Could not load auto-scheduler rules: {}", e),
    }

    let mut records = RecordsState::new();
    refresh_records(&api, &mut records).await;

    let client = EventStreamClient::with_reconnect_delay(websocket_url, reconnect_delay);
    let feed = JobFeed::new(client);
    let events = feed.subscribe();
    let feed_task = feed.start();
    let logger_task = tokio::spawn(log_feed_events(events));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let mut refresh = tokio::time::interval(refresh_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    refresh.tick().await; // skip immediate first tick, startup already fetched

    loop {
        tokio::select! {
            _ = refresh.tick() => refresh_records(&api, &mut records).await,
            _ = shutdown_rx.changed() => break,
        }
    }

    info!("Shutting down");
    feed.shutdown();
    let _ = feed_task.await;
    logger_task.abort();
    Ok(())
}

fn load_config() -> Result<Config, vthell::ConfigError> {
    let path = match std::env::args().nth(1) {
        Some(arg) => arg.into(),
        None => vthell::default_config_path()?,
    };
    info!("Using config file {:?}", path);
    vthell::load_config(path)
}

async fn refresh_records(api: &ApiClient, records: &mut RecordsState) {
    match api.get_records().await {
        Ok(snapshot) => {
            records.set_tree(snapshot.data);
            if let Some(tree) = records.tree() {
                let stats = aggregate(tree);
                info!(
                    "Archive: {} files, {} (backend reports {})",
                    stats.total_files,
                    humanize_bytes(stats.total_size),
                    humanize_bytes(snapshot.total_size),
                );
            }
        }
        Err(e) => warn!("Could not fetch archive records: {}", e),
    }
}

async fn log_feed_events(mut events: broadcast::Receiver<FeedEvent>) {
    loop {
        match events.recv().await {
            Ok(FeedEvent::Connected) => info!("Job feed connected"),
            Ok(FeedEvent::Disconnected) => warn!("Job feed dropped, reconnecting"),
            Ok(FeedEvent::Snapshot(jobs)) => {
                info!("Job snapshot: {} active", jobs.len());
                for job in &jobs {
                    info!(
                        "  [{}] {} ({}) starts {}",
                        job.status,
                        job.title,
                        job.id,
                        format_unix(job.start_time)
                    );
                }
            }
            Ok(FeedEvent::Scheduled(job)) => {
                info!(
                    "Scheduled: {} ({}) at {}",
                    job.title,
                    job.id,
                    format_unix(job.start_time)
                );
            }
            Ok(FeedEvent::Updated(job)) => match &job.error {
                Some(error) => warn!("{} ({}): {} - {}", job.title, job.id, job.status, error),
                None => info!("{} ({}): {}", job.title, job.id, job.status),
            },
            Ok(FeedEvent::Removed(id)) => info!("Job {} left the active set", id),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Feed logger lagged, missed {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn format_unix(unix: i64) -> String {
    chrono::DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("unix:{}", unix))
}

fn humanize_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = (bytes.ilog2() / 10).min(UNITS.len() as u32 - 1);
    let value = bytes as f64 / f64::powi(1024.0, exponent as i32);
    format!("{:.2} {}", value, UNITS[exponent as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_bytes() {
        assert_eq!(humanize_bytes(0), "0 B");
        assert_eq!(humanize_bytes(512), "512.00 B");
        assert_eq!(humanize_bytes(2048), "2.00 KiB");
        assert_eq!(humanize_bytes(5 * 1024 * 1024 * 1024), "5.00 GiB");
    }

    #[test]
    fn test_format_unix() {
        assert_eq!(format_unix(0), "1970-01-01T00:00:00+00:00");
    }
}
