//! Completion futures for asynchronous cloud jobs.
//!
//! A future looks at one log entry emitted by the hosting platform and decides whether the job it
//! belongs to finished, and how. [`FutureRegistry`] routes an entry to the future registered for
//! its `resource.type`:
//!
//! ```
//! use jobwatch_core::InboundEvent;
//! use jobwatch_futures::FutureRegistry;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = FutureRegistry::builder().build();
//! let event = InboundEvent::from_value(json!({
//!     "protoPayload": {
//!         "status": {},
//!         "serviceData": { "jobCompletedEvent": { "job": { "jobName": {
//!             "projectId": "test-project", "jobId": "test-bq-job-id"
//!         }}}}
//!     },
//!     "resource": { "type": "bigquery_resource" }
//! }))
//! .unwrap();
//!
//! let resolution = registry.handle_message(&event).await.unwrap();
//! let outcome = resolution.outcome().unwrap();
//! assert!(outcome.is_success);
//! assert_eq!(outcome.trigger_id, "test-bq-job-id");
//! # }
//! ```

use async_trait::async_trait;
use jobwatch_core::{FutureError, InboundEvent, JobType, Resolution};

pub mod bigquery;
pub mod dataflow;
pub mod instruments;
pub mod registry;

pub use bigquery::{BigQueryFuture, QueryJobCompletion};
pub use dataflow::{DataflowFuture, PipelineJobRef};
pub use instruments::{ERRORS_TOTAL, MESSAGES_TOTAL, describe_metrics};
pub use registry::{FutureRegistry, FutureRegistryBuilder, RegisteredFuture, RegistryError};

/// Resolves job completion for one job type.
#[async_trait]
pub trait JobFuture: Send + Sync {
    fn job_type(&self) -> JobType;

    /// Turns one log entry into a resolution. Entries of another job type are rejected with
    /// [`FutureError::UnsupportedJobType`].
    async fn handle_message(&self, event: &InboundEvent) -> Result<Resolution, FutureError>;
}

pub(crate) fn ensure_job_type(expected: JobType, event: &InboundEvent) -> Result<(), FutureError> {
    if event.job_type() == Some(expected) {
        Ok(())
    } else {
        Err(FutureError::UnsupportedJobType {
            resource_type: event.resource_type().to_string(),
        })
    }
}
