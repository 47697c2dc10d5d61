use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::FutureError;
use crate::job::JobType;

/// Monitored resource descriptor attached to every log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// One log entry as routed from the platform's logging sink.
///
/// Only the fields the futures look at are typed; everything else is kept in `extra` so the
/// entry can be logged or re-serialised without loss.
///
/// ```
/// use jobwatch_core::{InboundEvent, JobType};
/// use serde_json::json;
///
/// let event = InboundEvent::from_value(json!({
///     "textPayload": "Worker pool stopped.",
///     "resource": {
///         "type": "dataflow_step",
///         "labels": { "job_id": "df_job_id", "region": "us-central1" }
///     }
/// }))
/// .unwrap();
/// assert_eq!(event.job_type(), Some(JobType::Dataflow));
/// assert_eq!(event.label("job_id"), Some("df_job_id"));
/// assert_eq!(event.label("job_name"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl InboundEvent {
    /// Decodes a log entry from an already parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self, FutureError> {
        serde_json::from_value(value).map_err(|err| FutureError::MalformedPayload {
            job_type: None,
            reason: format!("log entry does not decode: {err}"),
        })
    }

    /// Decodes a log entry from raw JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, FutureError> {
        serde_json::from_str(raw).map_err(|err| FutureError::MalformedPayload {
            job_type: None,
            reason: format!("log entry does not decode: {err}"),
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource.resource_type
    }

    /// Job type registered for this entry's `resource.type`, if any.
    pub fn job_type(&self) -> Option<JobType> {
        JobType::from_resource_type(&self.resource.resource_type)
    }

    /// Returns a resource label, treating blank values as absent.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.resource
            .labels
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}
