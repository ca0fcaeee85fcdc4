//! Live job feed: applies stream events to the job registry and re-broadcasts
//! typed events for any frontend.
//!
//! Events are applied strictly in arrival order and the registry is only
//! touched through its reducer operations, so replayed or duplicated frames
//! cannot corrupt the collection.

use std::sync::{Arc, RwLock};

use log::{info, warn};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::model::{Job, JobUpdate};
use crate::registry::JobRegistry;
use crate::stream::{events, EventStreamClient};

const EVENT_CAPACITY: usize = 256;

/// A change to the tracked job set, derived from one stream frame.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Stream transport (re)established.
    Connected,
    /// Stream transport dropped; the client is reconnecting.
    Disconnected,
    /// Full snapshot replaced the registry.
    Snapshot(Vec<Job>),
    /// A new job was scheduled.
    Scheduled(Job),
    /// An existing job changed; carries the merged job.
    Updated(Job),
    /// A job was deleted, or finished and left the active set.
    Removed(String),
}

/// Owns the shared job registry and keeps it in sync with the event stream.
pub struct JobFeed {
    client: EventStreamClient,
    registry: Arc<RwLock<JobRegistry>>,
    events: broadcast::Sender<FeedEvent>,
}

impl JobFeed {
    pub fn new(client: EventStreamClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            registry: Arc::new(RwLock::new(JobRegistry::new())),
            events,
        }
    }

    pub fn client(&self) -> &EventStreamClient {
        &self.client
    }

    /// Subscribes to job set changes.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current sorted job list.
    pub fn jobs(&self) -> Vec<Job> {
        lock_read(&self.registry).jobs().to_vec()
    }

    /// Registers the stream handlers and opens the connection.
    pub fn start(&self) -> JoinHandle<()> {
        self.register_handlers();
        self.client.connect()
    }

    /// Deliberately stops the feed; the registry keeps its last state.
    pub fn shutdown(&self) {
        self.client.close();
    }

    fn register_handlers(&self) {
        let tx = self.events.clone();
        self.client.on(events::CONNECT, move |_| {
            let _ = tx.send(FeedEvent::Connected);
        });

        let tx = self.events.clone();
        self.client.on(events::CLOSED, move |_| {
            let _ = tx.send(FeedEvent::Disconnected);
        });

        let registry = Arc::clone(&self.registry);
        let tx = self.events.clone();
        self.client.on(events::JOB_INIT, move |data| {
            let jobs: Vec<Job> = match serde_json::from_value(data.clone()) {
                Ok(jobs) => jobs,
                Err(e) => {
                    warn!("Dropping malformed job snapshot: {}", e);
                    return;
                }
            };
            info!("Received job snapshot with {} entries", jobs.len());
            let mut registry = lock_write(&registry);
            registry.replace(jobs);
            let _ = tx.send(FeedEvent::Snapshot(registry.jobs().to_vec()));
        });

        let registry = Arc::clone(&self.registry);
        let tx = self.events.clone();
        self.client.on(events::JOB_SCHEDULED, move |data| {
            let job: Job = match serde_json::from_value(data.clone()) {
                Ok(job) => job,
                Err(e) => {
                    warn!("Dropping malformed scheduled job: {}", e);
                    return;
                }
            };
            let mut registry = lock_write(&registry);
            registry.add_one(job.clone());
            let _ = tx.send(FeedEvent::Scheduled(job));
        });

        let registry = Arc::clone(&self.registry);
        let tx = self.events.clone();
        self.client.on(events::JOB_UPDATE, move |data| {
            let update: JobUpdate = match serde_json::from_value(data.clone()) {
                Ok(update) => update,
                Err(e) => {
                    warn!("Dropping malformed job update: {}", e);
                    return;
                }
            };
            let mut registry = lock_write(&registry);
            if let Some(event) = apply_update(&mut registry, &update) {
                let _ = tx.send(event);
            }
        });

        let registry = Arc::clone(&self.registry);
        let tx = self.events.clone();
        self.client.on(events::JOB_DELETE, move |data| {
            let payload: DeletePayload = match serde_json::from_value(data.clone()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Dropping malformed job deletion: {}", e);
                    return;
                }
            };
            let mut registry = lock_write(&registry);
            if registry.remove(&payload.id) {
                let _ = tx.send(FeedEvent::Removed(payload.id));
            }
        });
    }
}

#[derive(Debug, Deserialize)]
struct DeletePayload {
    id: String,
}

/// Applies a `job_update` frame. An update reporting a terminal-for-display
/// status drops the job from the active set instead of merging it.
fn apply_update(registry: &mut JobRegistry, update: &JobUpdate) -> Option<FeedEvent> {
    if update.status.is_some_and(|status| status.is_terminal()) {
        if registry.remove(&update.id) {
            return Some(FeedEvent::Removed(update.id.clone()));
        }
        return None;
    }
    registry.update(update).map(FeedEvent::Updated)
}

fn lock_read(lock: &RwLock<JobRegistry>) -> std::sync::RwLockReadGuard<'_, JobRegistry> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Job registry lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn lock_write(lock: &RwLock<JobRegistry>) -> std::sync::RwLockWriteGuard<'_, JobRegistry> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Job registry lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobStatus;

    fn job(id: &str, start_time: i64, status: JobStatus) -> Job {
        Job {
            id: id.to_string(),
            title: "t".to_string(),
            filename: "f.mkv".to_string(),
            start_time,
            channel_id: "UC".to_string(),
            is_member: false,
            status,
            resolution: None,
            error: None,
        }
    }

    #[test]
    fn test_update_merges_non_terminal_status() {
        let mut registry = JobRegistry::new();
        registry.add_one(job("v1", 100, JobStatus::Waiting));
        let update = JobUpdate {
            id: "v1".to_string(),
            status: Some(JobStatus::Downloading),
            ..Default::default()
        };
        let event = apply_update(&mut registry, &update).unwrap();
        assert!(matches!(event, FeedEvent::Updated(ref j) if j.status == JobStatus::Downloading));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_terminal_update_drops_job() {
        for status in [JobStatus::Done, JobStatus::Cleaning] {
            let mut registry = JobRegistry::new();
            registry.add_one(job("v1", 100, JobStatus::Upload));
            let update = JobUpdate {
                id: "v1".to_string(),
                status: Some(status),
                ..Default::default()
            };
            let event = apply_update(&mut registry, &update).unwrap();
            assert!(matches!(event, FeedEvent::Removed(ref id) if id == "v1"));
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn test_terminal_update_for_unknown_job_is_silent() {
        let mut registry = JobRegistry::new();
        let update = JobUpdate {
            id: "ghost".to_string(),
            status: Some(JobStatus::Done),
            ..Default::default()
        };
        assert!(apply_update(&mut registry, &update).is_none());
    }

    #[test]
    fn test_snapshot_then_update_then_terminal() {
        let mut registry = JobRegistry::new();
        registry.replace(vec![job("v1", 100, JobStatus::Waiting)]);
        assert_eq!(registry.len(), 1);

        let update = JobUpdate {
            id: "v1".to_string(),
            status: Some(JobStatus::Downloading),
            ..Default::default()
        };
        apply_update(&mut registry, &update);
        assert_eq!(registry.get("v1").unwrap().status, JobStatus::Downloading);

        let done = JobUpdate {
            id: "v1".to_string(),
            status: Some(JobStatus::Done),
            ..Default::default()
        };
        apply_update(&mut registry, &done);
        assert!(registry.is_empty());
    }
}
