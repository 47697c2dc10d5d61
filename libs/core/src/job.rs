use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Job types with a registered completion future.
///
/// ```
/// use jobwatch_core::JobType;
///
/// assert_eq!(JobType::from_resource_type("dataflow_step"), Some(JobType::Dataflow));
/// assert_eq!(JobType::BigQuery.resource_type(), "bigquery_resource");
/// assert_eq!(JobType::from_resource_type("gce_instance"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Data-warehouse query job. The completion log entry carries the final status.
    BigQuery,
    /// Distributed batch pipeline. The completion log entry only says the workers stopped.
    Dataflow,
}

/// Static discriminator table: `resource.type` value -> job type.
const RESOURCE_TYPES: &[(&str, JobType)] = &[
    ("bigquery_resource", JobType::BigQuery),
    ("dataflow_step", JobType::Dataflow),
];

impl JobType {
    pub const ALL: [JobType; 2] = [JobType::BigQuery, JobType::Dataflow];

    /// Exact lookup of a log entry's `resource.type`.
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        RESOURCE_TYPES
            .iter()
            .find(|(name, _)| *name == resource_type)
            .map(|(_, job_type)| *job_type)
    }

    /// The `resource.type` value emitted by the platform for this job type.
    pub fn resource_type(&self) -> &'static str {
        match self {
            JobType::BigQuery => "bigquery_resource",
            JobType::Dataflow => "dataflow_step",
        }
    }

    /// Short identifier used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::BigQuery => "bigquery",
            JobType::Dataflow => "dataflow",
        }
    }
}

impl Display for JobType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
