//! Toggl Track back-end
//!
//! Each activity change stops the running time entry (if any) and starts a
//! new one tagged with the configured project. Requests are spaced by a
//! throttle period and retried with linear backoff on rate limiting. Transport
//! failures are retried only for idempotent requests: a POST that failed
//! mid-flight may already have created an entry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

use super::{ActivityTrigger, TriggerError, TriggerResult};
use crate::config::TogglConfig;

const RETRY_DELAY_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Running time entry as returned by the API
#[derive(Debug, Deserialize)]
struct TimeEntry {
    id: u64,
    workspace_id: u64,
}

/// Trigger that drives Toggl time entries.
pub struct TogglTrigger {
    client: Client,
    base_url: String,
    api_token: String,
    workspace_id: u64,
    project_id: Option<u64>,
    created_with: String,
    throttle: Duration,
    max_retries: u32,
    next_slot: Mutex<Option<Instant>>,
}

impl TogglTrigger {
    /// Create a trigger from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Config`] when the token or workspace is
    /// missing, or [`TriggerError::Http`] if the client cannot be built.
    pub fn new(config: &TogglConfig) -> TriggerResult<Self> {
        let api_token = config
            .api_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TriggerError::Config("toggl.api_token is not set".to_string()))?;
        let workspace_id = config
            .workspace_id
            .ok_or_else(|| TriggerError::Config("toggl.workspace_id is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token,
            workspace_id,
            project_id: config.project_id,
            created_with: config.created_with.clone(),
            throttle: Duration::from_millis(config.throttle_ms),
            max_retries: config.max_retries,
            next_slot: Mutex::new(None),
        })
    }

    /// Body for a new running time entry.
    fn new_entry_body(&self, description: &str, start: &str) -> serde_json::Value {
        json!({
            "description": description,
            "workspace_id": self.workspace_id,
            "project_id": self.project_id,
            "created_with": self.created_with,
            "start": start,
            "duration": -1,
        })
    }

    /// Wait until the throttle period since the previous request has passed.
    async fn throttle(&self) {
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            sleep_until(at).await;
        }
        *next_slot = Some(Instant::now() + self.throttle);
    }

    /// Send a request, retrying on 429.
    ///
    /// Transport errors are retried only when `idempotent` is set.
    async fn send<F>(&self, idempotent: bool, build: F) -> TriggerResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        loop {
            self.throttle().await;

            let request = build().basic_auth(&self.api_token, Some("api_token"));
            match request.send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    if retries >= self.max_retries {
                        return Err(TriggerError::RateLimited { attempts: retries + 1 });
                    }
                    retries += 1;
                    tracing::debug!(retries, "Toggl rate limited, backing off");
                    sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(retries))).await;
                }
                Ok(response) => return check_status(response).await,
                Err(e) if idempotent && retries < self.max_retries => {
                    retries += 1;
                    tracing::debug!(retries, error = %e, "Toggl request failed, retrying");
                    sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(retries))).await;
                }
                Err(e) => return Err(TriggerError::Http(e)),
            }
        }
    }

    async fn current_entry(&self) -> TriggerResult<Option<TimeEntry>> {
        let url = format!("{}/me/time_entries/current", self.base_url);
        let response = self.send(true, || self.client.get(&url)).await?;
        Ok(response.json::<Option<TimeEntry>>().await?)
    }
}

async fn check_status(response: Response) -> TriggerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or_default().to_string());
    Err(TriggerError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ActivityTrigger for TogglTrigger {
    fn name(&self) -> &'static str {
        "toggl"
    }

    async fn start(&self, label: &str) -> TriggerResult<()> {
        self.stop().await?;

        let url = format!("{}/workspaces/{}/time_entries", self.base_url, self.workspace_id);
        let start = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let body = self.new_entry_body(label, &start);

        self.send(false, || self.client.post(&url).json(&body)).await?;
        tracing::info!(label = %label, project = ?self.project_id, "Started Toggl time entry");
        Ok(())
    }

    async fn stop(&self) -> TriggerResult<()> {
        let Some(entry) = self.current_entry().await? else {
            return Ok(());
        };

        let url = format!(
            "{}/workspaces/{}/time_entries/{}/stop",
            self.base_url, entry.workspace_id, entry.id
        );
        self.send(true, || self.client.patch(&url)).await?;
        tracing::info!(entry = entry.id, "Stopped Toggl time entry");
        Ok(())
    }
}
