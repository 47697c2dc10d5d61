use std::error::Error as StdError;

use crate::job::JobType;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Conditions under which a future cannot establish a resolution for an event.
///
/// None of these is ever turned into a best-guess outcome; they are surfaced to the caller,
/// which decides whether to retry ([`FutureError::is_retryable`]) or dead-letter the event.
#[derive(Debug, thiserror::Error)]
pub enum FutureError {
    #[error("no future registered for resource type `{resource_type}`")]
    UnsupportedJobType { resource_type: String },

    #[error("malformed {} payload: {reason}", job_label(.job_type))]
    MalformedPayload {
        job_type: Option<JobType>,
        reason: String,
    },

    #[error("status query for job `{job_id}` failed: {reason}")]
    QueryFailed {
        job_id: String,
        reason: String,
        /// Whether the failure looked transient (transport, timeout, throttling, 5xx).
        transient: bool,
        #[source]
        source: Option<BoxError>,
    },

    #[error("job `{job_id}` reported unrecognised state `{state}`")]
    UnknownState { job_id: String, state: String },
}

fn job_label(job_type: &Option<JobType>) -> &'static str {
    job_type.map(|job_type| job_type.as_str()).unwrap_or("log entry")
}

impl FutureError {
    pub fn malformed(job_type: JobType, reason: impl Into<String>) -> Self {
        FutureError::MalformedPayload {
            job_type: Some(job_type),
            reason: reason.into(),
        }
    }

    pub fn query_failed(
        job_id: impl Into<String>,
        reason: impl Into<String>,
        transient: bool,
    ) -> Self {
        FutureError::QueryFailed {
            job_id: job_id.into(),
            reason: reason.into(),
            transient,
            source: None,
        }
    }

    /// Attaches the underlying cause to a `QueryFailed`; other variants are returned unchanged.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        if let FutureError::QueryFailed { source, .. } = &mut self {
            *source = Some(cause.into());
        }
        self
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            FutureError::UnsupportedJobType { .. } => "unsupported_job_type",
            FutureError::MalformedPayload { .. } => "malformed_payload",
            FutureError::QueryFailed { .. } => "query_failed",
            FutureError::UnknownState { .. } => "unknown_state",
        }
    }

    /// Only a failed status query can succeed on a later attempt with the same event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FutureError::QueryFailed { .. })
    }
}
