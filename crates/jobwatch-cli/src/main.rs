use std::{
    fs,
    io::{self, Read},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobwatch_core::{FutureError, InboundEvent, Resolution};
use jobwatch_futures::FutureRegistry;
use jobwatch_status::{
    DataflowStatusClient, SharedStatusClient, StaticStatusClient, StatusClientConfig,
};
use serde::Serialize;
use tracing::{Instrument, field, info_span};

const EXIT_PENDING: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _telemetry = jobwatch_telemetry::install("jobwatch")?;
    jobwatch_futures::describe_metrics();
    match cli.command {
        CliCommand::Resolve {
            event,
            state,
            project,
            pretty,
        } => handle_resolve(&event, state, project, pretty).await,
        CliCommand::JobTypes { state } => handle_job_types(state),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "jobwatch",
    version,
    about = "Resolve asynchronous job completion from platform log entries"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Resolve one log entry and print the resolution as JSON
    Resolve {
        /// Log entry to read; `-` reads stdin.
        #[arg(long, value_name = "PATH", default_value = "-")]
        event: String,
        /// Answer status queries with this state instead of calling the jobs API.
        #[arg(long, value_name = "STATE")]
        state: Option<String>,
        /// Jobs API project for entries without a project_id label.
        #[arg(long, value_name = "PROJECT", conflicts_with = "state")]
        project: Option<String>,
        #[arg(long)]
        pretty: bool,
    },
    /// List resource types that have a registered future
    JobTypes {
        #[arg(long, value_name = "STATE")]
        state: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    code: &'a str,
    message: String,
    retryable: bool,
}

#[derive(Serialize)]
struct JobTypeEntry {
    job_type: &'static str,
    resource_type: &'static str,
}

// A static state never touches the network, so the jobs API settings are only read without one.
fn status_client(state: Option<String>, project: Option<String>) -> Result<SharedStatusClient> {
    if let Some(state) = state {
        return Ok(Arc::new(StaticStatusClient::new(state)));
    }

    let mut config = StatusClientConfig::from_env().context("invalid status client configuration")?;
    if let Some(project) = project {
        config = config.with_default_project(project);
    }
    let client =
        DataflowStatusClient::new(&config).context("failed to build dataflow status client")?;
    Ok(Arc::new(client))
}

fn read_event(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read log entry from stdin")?;
        Ok(raw)
    } else {
        fs::read_to_string(source).with_context(|| format!("failed to read {source}"))
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

async fn handle_resolve(
    source: &str,
    state: Option<String>,
    project: Option<String>,
    pretty: bool,
) -> Result<ExitCode> {
    let registry = FutureRegistry::builder()
        .with_status_client(status_client(state, project)?)
        .build();
    let raw = read_event(source)?;

    let span = info_span!("jobwatch.resolve", job_type = field::Empty, trigger_id = field::Empty);
    let result = match InboundEvent::from_json_str(&raw) {
        Ok(event) => {
            if let Some(job_type) = event.job_type() {
                jobwatch_telemetry::with_job_fields(&span, job_type.as_str(), None);
            }
            registry
                .handle_message(&event)
                .instrument(span.clone())
                .await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(resolution) => {
            span.record("trigger_id", resolution.trigger_id());
            print_json(&resolution, pretty)?;
            Ok(match resolution {
                Resolution::Pending { .. } => ExitCode::from(EXIT_PENDING),
                Resolution::Complete(_) => ExitCode::SUCCESS,
            })
        }
        Err(err) => {
            print_json(&error_report(&err), pretty)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn error_report(err: &FutureError) -> ErrorReport<'static> {
    ErrorReport {
        code: err.code(),
        message: err.to_string(),
        retryable: err.is_retryable(),
    }
}

fn handle_job_types(state: Option<String>) -> Result<ExitCode> {
    let registry = FutureRegistry::builder()
        .with_status_client(status_client(state, None)?)
        .build();
    let entries: Vec<JobTypeEntry> = registry
        .job_types()
        .map(|job_type| JobTypeEntry {
            job_type: job_type.as_str(),
            resource_type: job_type.resource_type(),
        })
        .collect();
    print_json(&entries, false)?;
    Ok(ExitCode::SUCCESS)
}
