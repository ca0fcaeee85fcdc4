//! Ordered, deduplicated collection of in-flight recording jobs.

use crate::model::{Job, JobUpdate};

/// The canonical set of tracked jobs, unique by `id` and always sorted
/// ascending by `start_time`.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sorted view.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Inserts a job unless its `id` is already present.
    pub fn add_one(&mut self, job: Job) {
        if self.contains(&job.id) {
            return;
        }
        self.jobs.push(job);
        self.resort();
    }

    /// Inserts a batch; on duplicate ids the first occurrence wins, so
    /// pre-existing entries are never replaced by incoming ones.
    pub fn add_many(&mut self, jobs: Vec<Job>) {
        for job in jobs {
            if !self.contains(&job.id) {
                self.jobs.push(job);
            }
        }
        self.resort();
    }

    /// Drops everything and installs a fresh snapshot, deduplicated with
    /// first occurrence winning.
    pub fn replace(&mut self, jobs: Vec<Job>) {
        self.jobs.clear();
        self.add_many(jobs);
    }

    /// Merges a partial update into the stored job with the same id.
    ///
    /// Absent fields are left untouched. `error` is special: only a non-null
    /// incoming value overwrites, so a later status change does not erase a
    /// previously recorded failure message. Returns the merged job, or
    /// `None` when the id is unknown.
    pub fn update(&mut self, update: &JobUpdate) -> Option<Job> {
        let job = self.jobs.iter_mut().find(|j| j.id == update.id)?;
        if let Some(title) = &update.title {
            job.title = title.clone();
        }
        if let Some(filename) = &update.filename {
            job.filename = filename.clone();
        }
        if let Some(start_time) = update.start_time {
            job.start_time = start_time;
        }
        if let Some(channel_id) = &update.channel_id {
            job.channel_id = channel_id.clone();
        }
        if let Some(is_member) = update.is_member {
            job.is_member = is_member;
        }
        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(resolution) = &update.resolution {
            job.resolution = Some(resolution.clone());
        }
        if let Some(error) = &update.error {
            job.error = Some(error.clone());
        }
        let merged = job.clone();
        self.resort();
        Some(merged)
    }

    /// Removes the job with the given id, if present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id != id);
        self.jobs.len() != before
    }

    pub fn remove_many(&mut self, ids: &[String]) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !ids.iter().any(|id| id == &j.id));
        before - self.jobs.len()
    }

    pub fn reset(&mut self) {
        self.jobs.clear();
    }

    fn resort(&mut self) {
        // Stable sort: equal start times keep their insertion order.
        self.jobs.sort_by_key(|j| j.start_time);
    }
}
