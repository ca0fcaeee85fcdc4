//! Wire-level data model shared by the stream feed and the REST API.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle status of a recording job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting for the scheduled start time.
    Waiting,
    /// Recorder is being prepared.
    Preparing,
    /// Download in progress.
    Downloading,
    /// Download complete, muxing the container.
    Muxing,
    /// Uploading the muxed result.
    Upload,
    /// Upload complete, cleaning up scratch files.
    Cleaning,
    /// Fully finished.
    Done,
    /// Failed; `Job::error` carries the reason.
    Error,
    /// Cancelled by an operator; will not be retried.
    Cancelled,
}

impl JobStatus {
    /// Whether the active job list should drop a job reporting this status.
    ///
    /// `Cleaning` counts as terminal: once cleanup starts the recording
    /// itself is complete and the dashboard no longer tracks it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cleaning)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Waiting => write!(f, "Waiting"),
            JobStatus::Preparing => write!(f, "Preparing"),
            JobStatus::Downloading => write!(f, "Downloading"),
            JobStatus::Muxing => write!(f, "Muxing"),
            JobStatus::Upload => write!(f, "Uploading"),
            JobStatus::Cleaning => write!(f, "Cleaning up"),
            JobStatus::Done => write!(f, "Done"),
            JobStatus::Error => write!(f, "Error"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One tracked stream-recording task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Source platform video/stream id. Stable and unique.
    pub id: String,
    /// Stream title.
    pub title: String,
    /// Target output filename.
    #[serde(default)]
    pub filename: String,
    /// Scheduled start, unix seconds. Sole sort key of the registry.
    pub start_time: i64,
    /// Owning channel id.
    pub channel_id: String,
    /// Members-only content flag.
    #[serde(default)]
    pub is_member: bool,
    pub status: JobStatus,
    /// Selected resolution, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Failure reason, present when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial job payload carried by a `job_update` frame.
///
/// Fields absent from the frame stay `None` and leave the stored value
/// untouched; this is the explicit allow-list of mergeable fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub is_member: Option<bool>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Only a non-null value overwrites a previously recorded error, so a
    /// status change away from `Error` does not erase the message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Match kind of an auto-scheduler rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerRuleType {
    /// Plain substring match against the stream title.
    Word,
    /// Regex match against the stream title.
    Regex,
    /// Exact channel id match.
    Channel,
    /// Channel group membership.
    Group,
}

/// A `{type, data}` sub-rule chained under a word/regex rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerRuleBase {
    #[serde(rename = "type")]
    pub kind: SchedulerRuleType,
    pub data: String,
}

/// A persisted auto-scheduling filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerRule {
    /// Server-assigned id; `None` for an unsaved draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: SchedulerRuleType,
    /// Match pattern or value; semantics depend on `kind`.
    pub data: String,
    /// Further constraints, only meaningful on word/regex rules.
    #[serde(default)]
    pub chains: Option<Vec<SchedulerRuleBase>>,
    /// Include (`true`) or exclude (`false`) list membership.
    #[serde(default)]
    pub enabled: bool,
}

impl SchedulerRule {
    /// Sort key for the registry view; drafts order deterministically first.
    pub fn sort_key(&self) -> u64 {
        self.id.unwrap_or(0)
    }

    /// Validates user-submitted rule data before it reaches the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data.trim().is_empty() {
            return Err(ValidationError::EmptyField("data"));
        }
        if self.kind == SchedulerRuleType::Regex {
            validate_pattern(&self.data)?;
        }
        if let Some(chains) = &self.chains {
            if !matches!(
                self.kind,
                SchedulerRuleType::Word | SchedulerRuleType::Regex
            ) {
                return Err(ValidationError::ChainsNotAllowed);
            }
            for (index, chain) in chains.iter().enumerate() {
                if chain.data.trim().is_empty() {
                    return Err(ValidationError::EmptyChainData { index });
                }
                if chain.kind == SchedulerRuleType::Regex {
                    validate_pattern(&chain.data)?;
                }
            }
        }
        Ok(())
    }

    /// Clears `chains` on rule kinds that do not support them, matching what
    /// the editor does before submission.
    pub fn normalized(mut self) -> Self {
        if !matches!(
            self.kind,
            SchedulerRuleType::Word | SchedulerRuleType::Regex
        ) {
            self.chains = None;
        }
        self
    }
}

fn validate_pattern(pattern: &str) -> Result<(), ValidationError> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Partial rule payload for a PATCH request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerRulePatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchedulerRuleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chains: Option<Option<Vec<SchedulerRuleBase>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
