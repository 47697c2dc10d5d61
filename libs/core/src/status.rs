use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::FutureError;

/// Where a raw job state leaves the job from the orchestrator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Success,
    Failure,
    Pending,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Success => "success",
            Disposition::Failure => "failure",
            Disposition::Pending => "pending",
        }
    }
}

/// `currentState` values reported by the Dataflow jobs API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataflowJobState {
    Unknown,
    Stopped,
    Running,
    Done,
    Failed,
    Cancelled,
    Updated,
    Draining,
    Drained,
    Pending,
    Cancelling,
    Queued,
    ResourceCleaningUp,
}

const DATAFLOW_STATES: &[(&str, DataflowJobState)] = &[
    ("JOB_STATE_UNKNOWN", DataflowJobState::Unknown),
    ("JOB_STATE_STOPPED", DataflowJobState::Stopped),
    ("JOB_STATE_RUNNING", DataflowJobState::Running),
    ("JOB_STATE_DONE", DataflowJobState::Done),
    ("JOB_STATE_FAILED", DataflowJobState::Failed),
    ("JOB_STATE_CANCELLED", DataflowJobState::Cancelled),
    ("JOB_STATE_UPDATED", DataflowJobState::Updated),
    ("JOB_STATE_DRAINING", DataflowJobState::Draining),
    ("JOB_STATE_DRAINED", DataflowJobState::Drained),
    ("JOB_STATE_PENDING", DataflowJobState::Pending),
    ("JOB_STATE_CANCELLING", DataflowJobState::Cancelling),
    ("JOB_STATE_QUEUED", DataflowJobState::Queued),
    (
        "JOB_STATE_RESOURCE_CLEANING_UP",
        DataflowJobState::ResourceCleaningUp,
    ),
];

/// Raw state string that is not part of the Dataflow enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised dataflow job state `{0}`")]
pub struct UnrecognisedState(pub String);

impl FromStr for DataflowJobState {
    type Err = UnrecognisedState;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        DATAFLOW_STATES
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, state)| *state)
            .ok_or_else(|| UnrecognisedState(raw.to_string()))
    }
}

impl DataflowJobState {
    pub fn as_str(&self) -> &'static str {
        DATAFLOW_STATES
            .iter()
            .find(|(_, state)| state == self)
            .map(|(name, _)| *name)
            .unwrap_or("JOB_STATE_UNKNOWN")
    }

    /// `None` for `JOB_STATE_UNKNOWN`: the API itself does not know where the job is.
    pub fn disposition(&self) -> Option<Disposition> {
        use DataflowJobState::*;
        match self {
            Done => Some(Disposition::Success),
            Failed | Cancelled | Drained | Updated => Some(Disposition::Failure),
            Running | Pending | Queued | Stopped | Draining | Cancelling | ResourceCleaningUp => {
                Some(Disposition::Pending)
            }
            Unknown => None,
        }
    }
}

impl Display for DataflowJobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw Dataflow `currentState` to a disposition.
///
/// ```
/// use jobwatch_core::{map_dataflow_state, Disposition, FutureError};
///
/// assert_eq!(map_dataflow_state("df_job_id", "JOB_STATE_DONE").unwrap(), Disposition::Success);
/// assert_eq!(map_dataflow_state("df_job_id", "JOB_STATE_FAILED").unwrap(), Disposition::Failure);
/// assert_eq!(map_dataflow_state("df_job_id", "JOB_STATE_RUNNING").unwrap(), Disposition::Pending);
/// assert!(matches!(
///     map_dataflow_state("df_job_id", "JOB_STATE_SIDEWAYS"),
///     Err(FutureError::UnknownState { .. })
/// ));
/// ```
pub fn map_dataflow_state(job_id: &str, raw: &str) -> Result<Disposition, FutureError> {
    raw.parse::<DataflowJobState>()
        .ok()
        .and_then(|state| state.disposition())
        .ok_or_else(|| FutureError::UnknownState {
            job_id: job_id.to_string(),
            state: raw.to_string(),
        })
}
