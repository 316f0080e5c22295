use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::plan::CurriculumPlan;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend responded with status {0}")]
    Status(StatusCode),
    #[error("could not decode backend response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("reply task did not complete: {0}")]
    TaskFailed(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Reply body of `POST /chat`. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub learning_plan: Option<CurriculumPlan>,
    /// Passed through untouched for display
    #[serde(default)]
    pub agent_activity: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    chat_url: String,
}

impl BackendClient {
    pub fn new(chat_url: &str) -> Self {
        Self {
            client: Client::new(),
            chat_url: chat_url.to_string(),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Health endpoint lives next to the chat endpoint: `.../chat` -> `.../health`
    pub fn health_url(&self) -> String {
        let trimmed = self.chat_url.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if !trimmed[..idx].ends_with('/') => format!("{}/health", &trimmed[..idx]),
            _ => format!("{}/health", trimmed),
        }
    }

    pub async fn send_message(&self, message: &str) -> Result<ChatResponse, BackendError> {
        debug!(url = %self.chat_url, len = message.chars().count(), "send_message: posting");

        let response = self
            .client
            .post(&self.chat_url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(BackendError::Transport)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "send_message: backend returned error status");
            return Err(BackendError::Status(response.status()));
        }

        let reply: ChatResponse = response.json().await.map_err(BackendError::Decode)?;
        debug!(has_plan = reply.learning_plan.is_some(), "send_message: reply decoded");
        Ok(reply)
    }

    /// Returns the `status` field reported by the backend
    pub async fn health(&self) -> Result<String, BackendError> {
        let response = self
            .client
            .get(self.health_url())
            .send()
            .await
            .map_err(BackendError::Transport)?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        let health: HealthResponse = response.json().await.map_err(BackendError::Decode)?;
        Ok(health.status)
    }
}
