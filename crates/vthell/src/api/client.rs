//! HTTP client for the backend CRUD endpoints.
//!
//! Mutating requests carry an `Authorization: Password <secret>` header.
//! Collections are only updated by callers after a confirmed success
//! response; a failed request leaves local state untouched.

use std::time::Duration;

use log::{debug, info};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::error::{RequestError, Result};
use crate::model::{Job, SchedulerRule, SchedulerRulePatch};
use crate::records::TreeNode;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload of `GET /api/records`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsSnapshot {
    /// Root of the archive tree.
    pub data: TreeNode,
    /// Unix seconds of the last backend-side scan.
    pub last_updated: i64,
    /// Total archive size in bytes, as reported by the backend.
    pub total_size: u64,
}

#[derive(Debug, Deserialize)]
struct AutoSchedulerLists {
    include: Vec<SchedulerRule>,
    exclude: Vec<SchedulerRule>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    password: SecretString,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, password: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(RequestError::Transport)?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            password,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Password {}", self.password.expose_secret())
    }

    /// Schedules a recording for the given video id. Returns the created job.
    pub async fn schedule_job(&self, video_id: &str) -> Result<Job> {
        info!("Scheduling recording for {}", video_id);
        let response = self
            .http
            .post(self.endpoint("schedule"))
            .header("Authorization", self.auth_header())
            .json(&json!({ "id": video_id }))
            .send()
            .await
            .map_err(RequestError::Transport)?;
        let response = check_status(response).await?;
        Ok(decode_body(response).await?)
    }

    /// Deletes a job. Fails with `InvalidState` when the backend refuses,
    /// e.g. for a job that is currently recording.
    pub async fn delete_job(&self, id: &str) -> Result<()> {
        info!("Deleting job {}", id);
        let response = self
            .http
            .delete(self.endpoint(&format!("schedule/{}", id)))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(RequestError::Transport)?;
        check_status(response).await?;
        Ok(())
    }

    /// Fetches both auto-scheduler lists and merges them into one collection,
    /// exclude rules tagged disabled and include rules enabled, sorted by id
    /// with drafts first.
    pub async fn get_auto_scheduler(&self) -> Result<Vec<SchedulerRule>> {
        debug!("Fetching auto-scheduler rules");
        let response = self
            .http
            .get(self.endpoint("auto-scheduler"))
            .send()
            .await
            .map_err(RequestError::Transport)?;
        let response = check_status(response).await?;
        let lists: AutoSchedulerLists = decode_body(response).await?;
        Ok(merge_rule_lists(lists))
    }

    /// Creates a rule after local validation. Returns the stored rule with
    /// its server-assigned id.
    pub async fn add_scheduler_rule(&self, rule: SchedulerRule) -> Result<SchedulerRule> {
        rule.validate()?;
        let rule = rule.normalized();
        info!("Adding auto-scheduler rule '{}'", rule.data);
        let response = self
            .http
            .post(self.endpoint("auto-scheduler"))
            .header("Authorization", self.auth_header())
            .json(&rule)
            .send()
            .await
            .map_err(RequestError::Transport)?;
        let response = check_status(response).await?;
        Ok(decode_body(response).await?)
    }

    /// Patches a rule. Returns the updated rule as stored by the backend.
    pub async fn update_scheduler_rule(
        &self,
        id: u64,
        patch: &SchedulerRulePatch,
    ) -> Result<SchedulerRule> {
        info!("Patching auto-scheduler rule {}", id);
        let response = self
            .http
            .patch(self.endpoint(&format!("auto-scheduler/{}", id)))
            .header("Authorization", self.auth_header())
            .json(patch)
            .send()
            .await
            .map_err(RequestError::Transport)?;
        let response = check_status(response).await?;
        Ok(decode_body(response).await?)
    }

    pub async fn delete_scheduler_rule(&self, id: u64) -> Result<()> {
        info!("Deleting auto-scheduler rule {}", id);
        let response = self
            .http
            .delete(self.endpoint(&format!("auto-scheduler/{}", id)))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(RequestError::Transport)?;
        check_status(response).await?;
        Ok(())
    }

    /// Fetches the archive tree.
    pub async fn get_records(&self) -> Result<RecordsSnapshot> {
        debug!("Fetching archive records");
        let response = self
            .http
            .get(self.endpoint("records"))
            .send()
            .await
            .map_err(RequestError::Transport)?;
        let response = check_status(response).await?;
        Ok(decode_body(response).await?)
    }
}

fn merge_rule_lists(lists: AutoSchedulerLists) -> Vec<SchedulerRule> {
    let mut merged: Vec<SchedulerRule> = Vec::with_capacity(lists.include.len() + lists.exclude.len());
    for mut rule in lists.exclude {
        rule.enabled = false;
        merged.push(rule);
    }
    for mut rule in lists.include {
        rule.enabled = true;
        merged.push(rule);
    }
    merged.sort_by_key(|rule| rule.sort_key());
    merged
}

/// Maps non-success status codes to the user-facing error categories.
async fn check_status(response: Response) -> std::result::Result<Response, RequestError> {
    let status = response.status();
    if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
        return Ok(response);
    }
    Err(match status.as_u16() {
        400 => RequestError::BadRequest(read_error_message(response).await),
        401 => RequestError::Unauthorized,
        403 => RequestError::Forbidden,
        404 => RequestError::NotFound,
        406 => RequestError::InvalidState(read_error_message(response).await),
        500 => RequestError::Server,
        code => RequestError::UnexpectedStatus(code),
    })
}

async fn read_error_message(response: Response) -> String {
    response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| "no error message provided".to_string())
}

async fn decode_body<T: serde::de::DeserializeOwned>(
    response: Response,
) -> std::result::Result<T, RequestError> {
    let bytes = response.bytes().await.map_err(RequestError::Transport)?;
    serde_json::from_slice(&bytes).map_err(RequestError::Decode)
}
