use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies one job in the job-management API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusQuery {
    /// Project named by the log entry. `None` leaves the choice to the client's own project.
    pub project_id: Option<String>,
    pub job_id: String,
    pub region: String,
    pub job_name: String,
}

/// Fetches the current state of a job.
///
/// Implementations perform exactly one lookup per call and never cache: the caller asks because
/// it wants the state as of now.
#[async_trait]
pub trait JobStatusClient: Send + Sync {
    /// Returns the raw `currentState` string reported for the job.
    async fn current_state(&self, query: &StatusQuery) -> Result<String, StatusQueryError>;
}

pub type SharedStatusClient = Arc<dyn JobStatusClient>;

#[derive(Debug, Error)]
pub enum StatusQueryError {
    #[error("status client configuration error: {0}")]
    Config(String),
    #[error("status query timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("status query transport error")]
    Transport(#[source] reqwest::Error),
    #[error("status query rejected (status {status}): {message}")]
    Remote {
        status: StatusCode,
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("status query response decode error: {0}")]
    Decode(String),
}

impl StatusQueryError {
    /// Whether another attempt has a reasonable chance of succeeding without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            StatusQueryError::Timeout(_) | StatusQueryError::Transport(_) => true,
            StatusQueryError::Remote { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            StatusQueryError::Config(_) | StatusQueryError::Decode(_) => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StatusQueryError::Config(_) => "config",
            StatusQueryError::Timeout(_) => "timeout",
            StatusQueryError::Transport(_) => "transport",
            StatusQueryError::Remote { .. } => "remote",
            StatusQueryError::Decode(_) => "decode",
        }
    }
}
