use jobwatch_core::{FutureError, InboundEvent, JobType, Resolution, TerminalOutcome};
use serde_json::json;

#[test]
fn decodes_a_full_bigquery_audit_entry() {
    let raw = json!({
        "protoPayload": {
            "@type": "type.googleapis.com/google.cloud.audit.AuditLog",
            "status": {},
            "serviceName": "bigquery.googleapis.com",
            "methodName": "jobservice.jobcompleted",
            "serviceData": {
                "@type": "type.googleapis.com/google.cloud.bigquery.logging.v1.AuditData",
                "jobCompletedEvent": {
                    "eventName": "query_job_completed",
                    "job": {
                        "jobName": { "projectId": "test-project", "jobId": "test-bq-job-id", "location": "US" }
                    }
                }
            }
        },
        "insertId": "-xyz",
        "resource": {
            "type": "bigquery_resource",
            "labels": { "project_id": "test-project" }
        },
        "timestamp": "2020-06-01T12:00:00.000Z",
        "severity": "INFO",
        "logName": "projects/test-project/logs/cloudaudit.googleapis.com%2Fdata_access"
    });

    let event = InboundEvent::from_value(raw).unwrap();
    assert_eq!(event.job_type(), Some(JobType::BigQuery));
    assert_eq!(event.label("project_id"), Some("test-project"));
    assert!(event.proto_payload.is_some());
    assert_eq!(event.extra["severity"], "INFO");
}

#[test]
fn decodes_a_dataflow_worker_pool_entry() {
    let event = InboundEvent::from_json_str(
        r#"{
            "textPayload": "Worker pool stopped.",
            "resource": {
                "type": "dataflow_step",
                "labels": {
                    "job_name": "my_dataflow_job",
                    "region": "us-central1",
                    "job_id": "df_job_id",
                    "step_id": ""
                }
            }
        }"#,
    )
    .unwrap();

    assert_eq!(event.job_type(), Some(JobType::Dataflow));
    assert_eq!(event.text_payload.as_deref(), Some("Worker pool stopped."));
    assert_eq!(event.label("region"), Some("us-central1"));
    assert_eq!(event.label("step_id"), None);
}

#[test]
fn invalid_json_is_malformed_not_unsupported() {
    let err = InboundEvent::from_json_str("{ not json").unwrap_err();
    assert_eq!(err.code(), "malformed_payload");
    assert!(!err.is_retryable());
}

#[test]
fn success_never_carries_an_error() {
    let outcome: TerminalOutcome = serde_json::from_value(json!({
        "trigger_id": "test-bq-job-id",
        "is_success": true
    }))
    .unwrap();
    assert_eq!(outcome, TerminalOutcome::success("test-bq-job-id"));

    let resolution = Resolution::from(outcome);
    assert_eq!(resolution.trigger_id(), "test-bq-job-id");
    assert_eq!(resolution.outcome().and_then(|o| o.error.as_ref()), None);
}

#[test]
fn unknown_state_names_the_job() {
    let err = jobwatch_core::map_dataflow_state("df_job_id", "JOB_STATE_PAUSED").unwrap_err();
    assert!(matches!(err, FutureError::UnknownState { .. }));
    assert_eq!(
        err.to_string(),
        "job `df_job_id` reported unrecognised state `JOB_STATE_PAUSED`"
    );
}
