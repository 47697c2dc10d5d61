use async_trait::async_trait;
use jobwatch_core::{
    Disposition, FutureError, InboundEvent, JobType, Resolution, TerminalOutcome,
    map_dataflow_state,
};
use jobwatch_status::{SharedStatusClient, StatusQuery};
use tracing::{debug, warn};

use crate::{JobFuture, ensure_job_type};

/// Future for Dataflow jobs.
///
/// The `Worker pool stopped.` entry a Dataflow job emits says nothing about how the job ended,
/// so the future asks the jobs API for the job's current state every time it sees one. Route
/// those entries with a sink filter such as
/// `resource.type="dataflow_step" AND textPayload="Worker pool stopped."`.
#[derive(Clone)]
pub struct DataflowFuture {
    client: SharedStatusClient,
}

impl DataflowFuture {
    pub fn new(client: SharedStatusClient) -> Self {
        Self { client }
    }
}

/// Job coordinates carried on a `dataflow_step` resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineJobRef {
    pub job_id: String,
    pub region: String,
    pub job_name: String,
    pub project_id: Option<String>,
}

impl PipelineJobRef {
    pub fn extract(event: &InboundEvent) -> Result<Self, FutureError> {
        let required = |key: &str| {
            event.label(key).map(str::to_string).ok_or_else(|| {
                FutureError::malformed(JobType::Dataflow, format!("missing resource.labels.{key}"))
            })
        };
        Ok(Self {
            job_id: required("job_id")?,
            region: required("region")?,
            job_name: required("job_name")?,
            project_id: event.label("project_id").map(str::to_string),
        })
    }

    /// The project is passed through as found; a client fills in its own when it is absent.
    pub fn into_query(self) -> StatusQuery {
        StatusQuery {
            project_id: self.project_id,
            job_id: self.job_id,
            region: self.region,
            job_name: self.job_name,
        }
    }
}

#[async_trait]
impl JobFuture for DataflowFuture {
    fn job_type(&self) -> JobType {
        JobType::Dataflow
    }

    async fn handle_message(&self, event: &InboundEvent) -> Result<Resolution, FutureError> {
        ensure_job_type(JobType::Dataflow, event)?;
        let query = PipelineJobRef::extract(event)?.into_query();

        let state = self.client.current_state(&query).await.map_err(|err| {
            warn!(job_id = %query.job_id, error = %err, "dataflow status query failed");
            FutureError::query_failed(query.job_id.clone(), err.to_string(), err.is_transient())
                .with_source(err)
        })?;
        debug!(job_id = %query.job_id, job_name = %query.job_name, state = %state, "dataflow job state");

        let resolution: Resolution = match map_dataflow_state(&query.job_id, &state)? {
            Disposition::Success => TerminalOutcome::success(query.job_id).into(),
            Disposition::Failure => TerminalOutcome::failure(query.job_id, None).into(),
            Disposition::Pending => Resolution::Pending {
                trigger_id: query.job_id,
                state,
            },
        };
        Ok(resolution)
    }
}
