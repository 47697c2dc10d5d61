use serde::{Deserialize, Serialize};

/// Final success/failure verdict for one job, keyed by the id the orchestrator waits on.
///
/// ```
/// use jobwatch_core::TerminalOutcome;
///
/// let ok = TerminalOutcome::success("test-bq-job-id");
/// assert!(ok.is_success);
/// assert_eq!(ok.error, None);
///
/// let failed = TerminalOutcome::failure("test-bq-job-id", Some("test error message".into()));
/// assert!(!failed.is_success);
/// assert_eq!(failed.error.as_deref(), Some("test error message"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOutcome {
    pub trigger_id: String,
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TerminalOutcome {
    pub fn success(trigger_id: impl Into<String>) -> Self {
        Self {
            trigger_id: trigger_id.into(),
            is_success: true,
            error: None,
        }
    }

    /// A failed outcome. An empty message is recorded as no message.
    pub fn failure(trigger_id: impl Into<String>, error: Option<String>) -> Self {
        Self {
            trigger_id: trigger_id.into(),
            is_success: false,
            error: error.filter(|message| !message.is_empty()),
        }
    }
}

/// What a future concluded from one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// The job reached a terminal state.
    Complete(TerminalOutcome),
    /// The job is still in flight; the caller decides when to look again.
    Pending { trigger_id: String, state: String },
}

impl Resolution {
    pub fn trigger_id(&self) -> &str {
        match self {
            Resolution::Complete(outcome) => &outcome.trigger_id,
            Resolution::Pending { trigger_id, .. } => trigger_id,
        }
    }

    pub fn outcome(&self) -> Option<&TerminalOutcome> {
        match self {
            Resolution::Complete(outcome) => Some(outcome),
            Resolution::Pending { .. } => None,
        }
    }

    pub fn into_outcome(self) -> Option<TerminalOutcome> {
        match self {
            Resolution::Complete(outcome) => Some(outcome),
            Resolution::Pending { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Pending { .. })
    }

    /// Label used for logs and metrics: `success`, `failure` or `pending`.
    pub fn disposition_label(&self) -> &'static str {
        match self {
            Resolution::Complete(outcome) if outcome.is_success => "success",
            Resolution::Complete(_) => "failure",
            Resolution::Pending { .. } => "pending",
        }
    }
}

impl From<TerminalOutcome> for Resolution {
    fn from(outcome: TerminalOutcome) -> Self {
        Resolution::Complete(outcome)
    }
}
