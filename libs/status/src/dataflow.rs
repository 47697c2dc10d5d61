use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{JobStatusClient, StatusQuery, StatusQueryError};
use crate::config::StatusClientConfig;
use crate::instruments::{DATAFLOW_JOBS_GET, STATUS_QUERY_ERRORS_TOTAL, STATUS_QUERY_SECONDS};

/// Dataflow `projects.locations.jobs.get` over REST.
///
/// Queries whose log entry named no project go to the configured default project.
pub struct DataflowStatusClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
    default_project: Option<String>,
}

impl DataflowStatusClient {
    pub fn new(config: &StatusClientConfig) -> Result<Self, StatusQueryError> {
        let client = Client::builder()
            .user_agent(concat!("jobwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|err| StatusQueryError::Config(format!("failed to build HTTP client: {err}")))?;
        Self::with_client(client, config)
    }

    /// Uses a caller-built HTTP client; the config's timeout is then the client's business.
    pub fn with_client(client: Client, config: &StatusClientConfig) -> Result<Self, StatusQueryError> {
        let base_url = Url::parse(&config.api_base).map_err(|err| {
            StatusQueryError::Config(format!("invalid api base `{}`: {err}", config.api_base))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StatusQueryError::Config(format!(
                "api base `{}` cannot carry a path",
                config.api_base
            )));
        }
        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
            default_project: config.default_project.clone(),
        })
    }

    /// Project the query runs against: the entry's own, else the configured default.
    pub fn project_for<'a>(&'a self, query: &'a StatusQuery) -> Result<&'a str, StatusQueryError> {
        query
            .project_id
            .as_deref()
            .or(self.default_project.as_deref())
            .ok_or_else(|| {
                StatusQueryError::Config(format!(
                    "no project for job `{}`: the log entry names none and no default project is configured",
                    query.job_id
                ))
            })
    }

    /// `{base}/v1b3/projects/{project}/locations/{region}/jobs/{job_id}`, each segment escaped.
    pub fn job_url(&self, query: &StatusQuery) -> Result<Url, StatusQueryError> {
        let project = self.project_for(query)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StatusQueryError::Config("api base cannot carry a path".into()))?
            .pop_if_empty()
            .extend([
                "v1b3",
                "projects",
                project,
                "locations",
                query.region.as_str(),
                "jobs",
                query.job_id.as_str(),
            ]);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJob {
    #[serde(default)]
    current_state: Option<String>,
}

#[async_trait]
impl JobStatusClient for DataflowStatusClient {
    async fn current_state(&self, query: &StatusQuery) -> Result<String, StatusQueryError> {
        let url = self.job_url(query)?;
        debug!(
            job_id = %query.job_id,
            job_name = %query.job_name,
            region = %query.region,
            "querying dataflow job state"
        );

        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|err| {
            let kind = if err.is_timeout() { "timeout" } else { "transport" };
            counter!(STATUS_QUERY_ERRORS_TOTAL, "kind" => kind, "endpoint" => DATAFLOW_JOBS_GET)
                .increment(1);
            warn!(job_id = %query.job_id, error = %err, "dataflow status query failed");
            if err.is_timeout() {
                StatusQueryError::Timeout(err)
            } else {
                StatusQueryError::Transport(err)
            }
        })?;

        let status = response.status();
        histogram!(
            STATUS_QUERY_SECONDS,
            "endpoint" => DATAFLOW_JOBS_GET,
            "status" => status.as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        if !status.is_success() {
            let retry_after = retry_after(&response);
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".into());
            counter!(
                STATUS_QUERY_ERRORS_TOTAL,
                "kind" => "remote",
                "endpoint" => DATAFLOW_JOBS_GET,
                "status" => status.as_str().to_string()
            )
            .increment(1);
            warn!(job_id = %query.job_id, status = status.as_u16(), "dataflow rejected status query");
            return Err(StatusQueryError::Remote {
                status,
                retry_after,
                message: truncate(body, 512),
            });
        }

        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                StatusQueryError::Timeout(err)
            } else {
                StatusQueryError::Transport(err)
            }
        })?;
        let job: RawJob = serde_json::from_str(&body)
            .map_err(|err| StatusQueryError::Decode(format!("invalid job resource: {err}")))?;
        job.current_state
            .ok_or_else(|| StatusQueryError::Decode("job resource has no currentState".into()))
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
