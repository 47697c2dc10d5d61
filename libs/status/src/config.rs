use std::env;
use std::time::Duration;

pub const DEFAULT_DATAFLOW_API_BASE: &str = "https://dataflow.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got `{value}`")]
    InvalidTimeout { name: &'static str, value: String },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

/// Connection settings for [`DataflowStatusClient`](crate::DataflowStatusClient).
///
/// Credentials are supplied by the caller; the client only forwards the bearer token it is
/// given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusClientConfig {
    pub api_base: String,
    pub default_project: Option<String>,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for StatusClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_DATAFLOW_API_BASE.to_string(),
            default_project: None,
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl StatusClientConfig {
    /// Reads `DATAFLOW_API_BASE`, `JOBWATCH_PROJECT_ID` (or `GOOGLE_CLOUD_PROJECT`),
    /// `JOBWATCH_ACCESS_TOKEN` and `JOBWATCH_STATUS_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_base = match lookup("DATAFLOW_API_BASE") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    name: "DATAFLOW_API_BASE",
                });
            }
            Some(value) => value.trim().to_string(),
            None => DEFAULT_DATAFLOW_API_BASE.to_string(),
        };

        let default_project =
            non_blank("JOBWATCH_PROJECT_ID").or_else(|| non_blank("GOOGLE_CLOUD_PROJECT"));
        let access_token = non_blank("JOBWATCH_ACCESS_TOKEN");

        let timeout = match lookup("JOBWATCH_STATUS_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        name: "JOBWATCH_STATUS_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base,
            default_project,
            access_token,
            timeout,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_default_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = Some(project.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
