use std::io::Write;
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::NamedTempFile;

fn cli_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jobwatch"));
    cmd.env_remove("JOBWATCH_PROJECT_ID")
        .env_remove("GOOGLE_CLOUD_PROJECT")
        .env_remove("DATAFLOW_API_BASE")
        .env_remove("JOBWATCH_STATUS_TIMEOUT_SECS")
        .env("ENABLE_OTEL", "false");
    cmd
}

fn event_file(event: Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(event.to_string().as_bytes())
        .expect("write event");
    file
}

fn run(args: &[&str]) -> (Output, Value) {
    let output = cli_cmd().args(args).output().expect("run jobwatch CLI");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json = serde_json::from_str(stdout.trim()).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): status={:?}\nstdout={}\nstderr={}",
            output.status,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    });
    (output, json)
}

fn dataflow_event() -> NamedTempFile {
    event_file(json!({
        "textPayload": "Worker pool stopped.",
        "resource": {
            "type": "dataflow_step",
            "labels": {
                "job_name": "my_dataflow_job",
                "region": "us-central1",
                "job_id": "df_job_id"
            }
        }
    }))
}

#[test]
fn resolves_bigquery_failure() {
    let file = event_file(json!({
        "protoPayload": {
            "status": { "code": 1, "message": "test error message" },
            "serviceData": { "jobCompletedEvent": { "job": { "jobName": {
                "projectId": "test-project", "jobId": "test-bq-job-id"
            }}}}
        },
        "resource": { "type": "bigquery_resource" }
    }));
    let path = file.path().to_str().unwrap();

    let (output, json) = run(&["resolve", "--event", path, "--state", "JOB_STATE_DONE"]);
    assert!(output.status.success());
    assert_eq!(
        json,
        json!({
            "status": "complete",
            "trigger_id": "test-bq-job-id",
            "is_success": false,
            "error": "test error message"
        })
    );
}

#[test]
fn resolves_dataflow_with_static_state() {
    let file = dataflow_event();
    let path = file.path().to_str().unwrap();

    let (output, json) = run(&[
        "resolve",
        "--event",
        path,
        "--state",
        "JOB_STATE_DONE",
    ]);
    assert!(output.status.success());
    assert_eq!(
        json,
        json!({ "status": "complete", "trigger_id": "df_job_id", "is_success": true })
    );
}

#[test]
fn pending_dataflow_job_exits_with_two() {
    let file = dataflow_event();
    let path = file.path().to_str().unwrap();

    let (output, json) = run(&[
        "resolve",
        "--event",
        path,
        "--state",
        "JOB_STATE_RUNNING",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(json["status"], "pending");
    assert_eq!(json["state"], "JOB_STATE_RUNNING");
}

#[test]
fn dry_run_ignores_status_client_environment() {
    let file = dataflow_event();
    let path = file.path().to_str().unwrap();

    let output = cli_cmd()
        .env("JOBWATCH_STATUS_TIMEOUT_SECS", "soon")
        .env("DATAFLOW_API_BASE", "")
        .args(["resolve", "--event", path, "--state", "JOB_STATE_FAILED"])
        .output()
        .expect("run jobwatch CLI");
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(
        json,
        json!({ "status": "complete", "trigger_id": "df_job_id", "is_success": false })
    );
}

#[test]
fn invalid_environment_fails_without_static_state() {
    let file = dataflow_event();
    let path = file.path().to_str().unwrap();

    let output = cli_cmd()
        .env("JOBWATCH_STATUS_TIMEOUT_SECS", "soon")
        .args(["resolve", "--event", path])
        .output()
        .expect("run jobwatch CLI");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("JOBWATCH_STATUS_TIMEOUT_SECS"));
}

#[test]
fn unsupported_entry_reports_error_code() {
    let file = event_file(json!({ "resource": { "type": "gce_instance" } }));
    let path = file.path().to_str().unwrap();

    let (output, json) = run(&["resolve", "--event", path, "--state", "JOB_STATE_DONE"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json["code"], "unsupported_job_type");
    assert_eq!(json["retryable"], false);
}

#[test]
fn lists_job_types() {
    let (output, json) = run(&["job-types", "--state", "JOB_STATE_DONE"]);
    assert!(output.status.success());
    assert_eq!(
        json,
        json!([
            { "job_type": "bigquery", "resource_type": "bigquery_resource" },
            { "job_type": "dataflow", "resource_type": "dataflow_step" }
        ])
    );
}
