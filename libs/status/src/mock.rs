use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::client::{JobStatusClient, StatusQuery, StatusQueryError};

#[derive(Debug, Clone)]
enum Reply {
    State(String),
    Rejected(StatusCode),
}

/// In-memory client that answers every query the same way and records what it was asked.
pub struct StaticStatusClient {
    reply: Reply,
    pub queries: Mutex<Vec<StatusQuery>>,
}

impl StaticStatusClient {
    /// Reports `state` for every job.
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            reply: Reply::State(state.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every query with the given HTTP status.
    pub fn rejecting(status: StatusCode) -> Self {
        Self {
            reply: Reply::Rejected(status),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub async fn recorded(&self) -> Vec<StatusQuery> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl JobStatusClient for StaticStatusClient {
    async fn current_state(&self, query: &StatusQuery) -> Result<String, StatusQueryError> {
        self.queries.lock().await.push(query.clone());
        match &self.reply {
            Reply::State(state) => Ok(state.clone()),
            Reply::Rejected(status) => Err(StatusQueryError::Remote {
                status: *status,
                retry_after: None,
                message: format!("static client rejected query for {}", query.job_id),
            }),
        }
    }
}
