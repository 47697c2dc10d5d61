use async_trait::async_trait;
use jobwatch_core::{FutureError, InboundEvent, JobType, Resolution, TerminalOutcome};
use serde::Deserialize;
use tracing::debug;

use crate::{JobFuture, ensure_job_type};

/// Future for BigQuery jobs.
///
/// BigQuery writes one audit entry when a job completes and that entry already carries the final
/// status, so this future never calls out.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigQueryFuture;

impl BigQueryFuture {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditLog {
    #[serde(default)]
    status: Option<AuditStatus>,
    #[serde(default)]
    service_data: Option<ServiceData>,
}

#[derive(Debug, Default, Deserialize)]
struct AuditStatus {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceData {
    #[serde(default)]
    job_completed_event: Option<JobCompletedEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct JobCompletedEvent {
    #[serde(default)]
    job: Option<AuditJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditJob {
    #[serde(default)]
    job_name: Option<JobName>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobName {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

/// Fields pulled out of a BigQuery `jobcompleted` audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryJobCompletion {
    pub job_id: String,
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
}

impl QueryJobCompletion {
    pub fn extract(event: &InboundEvent) -> Result<Self, FutureError> {
        let payload = event
            .proto_payload
            .as_ref()
            .ok_or_else(|| FutureError::malformed(JobType::BigQuery, "missing protoPayload"))?;
        let audit = AuditLog::deserialize(payload).map_err(|err| {
            FutureError::malformed(JobType::BigQuery, format!("protoPayload: {err}"))
        })?;

        let job_name = audit
            .service_data
            .and_then(|data| data.job_completed_event)
            .and_then(|completed| completed.job)
            .and_then(|job| job.job_name)
            .ok_or_else(|| {
                FutureError::malformed(
                    JobType::BigQuery,
                    "missing serviceData.jobCompletedEvent.job.jobName",
                )
            })?;
        let job_id = job_name
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                FutureError::malformed(
                    JobType::BigQuery,
                    "missing serviceData.jobCompletedEvent.job.jobName.jobId",
                )
            })?;

        let status = audit.status.unwrap_or_default();
        Ok(Self {
            job_id,
            project_id: job_name.project_id,
            location: job_name.location,
            status_code: status.code,
            status_message: status.message,
        })
    }

    /// BigQuery leaves the status block empty on success and sets a non-zero code on error.
    pub fn is_failure(&self) -> bool {
        self.status_code.is_some_and(|code| code != 0)
            || self
                .status_message
                .as_deref()
                .is_some_and(|message| !message.is_empty())
    }

    pub fn into_outcome(self) -> TerminalOutcome {
        if self.is_failure() {
            TerminalOutcome::failure(self.job_id, self.status_message)
        } else {
            TerminalOutcome::success(self.job_id)
        }
    }
}

#[async_trait]
impl JobFuture for BigQueryFuture {
    fn job_type(&self) -> JobType {
        JobType::BigQuery
    }

    async fn handle_message(&self, event: &InboundEvent) -> Result<Resolution, FutureError> {
        ensure_job_type(JobType::BigQuery, event)?;
        let completion = QueryJobCompletion::extract(event)?;
        debug!(
            job_id = %completion.job_id,
            status_code = ?completion.status_code,
            "bigquery job completed"
        );
        Ok(Resolution::Complete(completion.into_outcome()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn entry(status: Value) -> InboundEvent {
        InboundEvent::from_value(json!({
            "protoPayload": {
                "status": status,
                "serviceData": {
                    "jobCompletedEvent": {
                        "job": {
                            "jobName": { "projectId": "test-project", "jobId": "job-7", "location": "EU" }
                        }
                    }
                }
            },
            "resource": { "type": "bigquery_resource" }
        }))
        .unwrap()
    }

    #[test]
    fn extracts_job_name_fields() {
        let completion = QueryJobCompletion::extract(&entry(json!({}))).unwrap();
        assert_eq!(completion.job_id, "job-7");
        assert_eq!(completion.project_id.as_deref(), Some("test-project"));
        assert_eq!(completion.location.as_deref(), Some("EU"));
        assert!(!completion.is_failure());
    }

    #[test]
    fn zero_code_without_message_is_success() {
        let outcome = QueryJobCompletion::extract(&entry(json!({ "code": 0 })))
            .unwrap()
            .into_outcome();
        assert_eq!(outcome, TerminalOutcome::success("job-7"));
    }

    #[test]
    fn null_status_is_success() {
        let outcome = QueryJobCompletion::extract(&entry(Value::Null))
            .unwrap()
            .into_outcome();
        assert!(outcome.is_success);
    }

    #[test]
    fn missing_status_key_is_success() {
        let event = InboundEvent::from_value(json!({
            "protoPayload": {
                "serviceData": {
                    "jobCompletedEvent": { "job": { "jobName": { "jobId": "job-7" } } }
                }
            },
            "resource": { "type": "bigquery_resource" }
        }))
        .unwrap();
        let completion = QueryJobCompletion::extract(&event).unwrap();
        assert_eq!(completion.status_code, None);
        assert_eq!(completion.into_outcome(), TerminalOutcome::success("job-7"));
    }

    #[test]
    fn code_without_message_fails_without_error_text() {
        let outcome = QueryJobCompletion::extract(&entry(json!({ "code": 5 })))
            .unwrap()
            .into_outcome();
        assert_eq!(outcome, TerminalOutcome::failure("job-7", None));
        assert_eq!(outcome.error, None);
    }

    #[test]
    fn message_without_code_fails_verbatim() {
        let outcome = QueryJobCompletion::extract(&entry(json!({ "message": "  Quota exceeded " })))
            .unwrap()
            .into_outcome();
        assert!(!outcome.is_success);
        assert_eq!(outcome.error.as_deref(), Some("  Quota exceeded "));
    }

    #[test]
    fn missing_job_id_is_malformed() {
        let event = InboundEvent::from_value(json!({
            "protoPayload": {
                "status": { "code": 3, "message": "bad" },
                "serviceData": { "jobCompletedEvent": { "job": { "jobName": { "projectId": "p" } } } }
            },
            "resource": { "type": "bigquery_resource" }
        }))
        .unwrap();
        let err = QueryJobCompletion::extract(&event).unwrap_err();
        assert!(matches!(
            err,
            FutureError::MalformedPayload {
                job_type: Some(JobType::BigQuery),
                ..
            }
        ));
        assert!(err.to_string().contains("jobName.jobId"));
    }

    #[test]
    fn missing_proto_payload_is_malformed() {
        let event = InboundEvent::from_value(json!({
            "textPayload": "job done",
            "resource": { "type": "bigquery_resource" }
        }))
        .unwrap();
        let err = QueryJobCompletion::extract(&event).unwrap_err();
        assert_eq!(err.code(), "malformed_payload");
        assert!(err.to_string().contains("protoPayload"));
    }

    #[test]
    fn mistyped_job_id_is_malformed() {
        let event = InboundEvent::from_value(json!({
            "protoPayload": {
                "serviceData": { "jobCompletedEvent": { "job": { "jobName": { "jobId": 42 } } } }
            },
            "resource": { "type": "bigquery_resource" }
        }))
        .unwrap();
        assert_eq!(
            QueryJobCompletion::extract(&event).unwrap_err().code(),
            "malformed_payload"
        );
    }
}
