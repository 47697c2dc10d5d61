use std::collections::BTreeMap;

use async_trait::async_trait;
use jobwatch_core::{FutureError, InboundEvent, JobType, Resolution};
use jobwatch_status::SharedStatusClient;
use metrics::counter;
use tracing::{Instrument, field, info, info_span, warn};

use crate::JobFuture;
use crate::bigquery::BigQueryFuture;
use crate::dataflow::DataflowFuture;
use crate::instruments::{ERRORS_TOTAL, MESSAGES_TOTAL};

/// The closed set of futures a registry can hold.
#[derive(Clone)]
pub enum RegisteredFuture {
    BigQuery(BigQueryFuture),
    Dataflow(DataflowFuture),
}

impl From<BigQueryFuture> for RegisteredFuture {
    fn from(future: BigQueryFuture) -> Self {
        RegisteredFuture::BigQuery(future)
    }
}

impl From<DataflowFuture> for RegisteredFuture {
    fn from(future: DataflowFuture) -> Self {
        RegisteredFuture::Dataflow(future)
    }
}

#[async_trait]
impl JobFuture for RegisteredFuture {
    fn job_type(&self) -> JobType {
        match self {
            RegisteredFuture::BigQuery(future) => future.job_type(),
            RegisteredFuture::Dataflow(future) => future.job_type(),
        }
    }

    async fn handle_message(&self, event: &InboundEvent) -> Result<Resolution, FutureError> {
        match self {
            RegisteredFuture::BigQuery(future) => future.handle_message(event).await,
            RegisteredFuture::Dataflow(future) => future.handle_message(event).await,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("future for `{0}` already registered")]
    AlreadyRegistered(JobType),
}

/// Builder for the usual registry: BigQuery always, Dataflow when a status client is supplied.
#[derive(Default)]
pub struct FutureRegistryBuilder {
    status_client: Option<SharedStatusClient>,
}

impl FutureRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_client(mut self, client: SharedStatusClient) -> Self {
        self.status_client = Some(client);
        self
    }

    pub fn build(self) -> FutureRegistry {
        let mut entries = BTreeMap::new();
        entries.insert(JobType::BigQuery, BigQueryFuture::new().into());
        if let Some(client) = self.status_client {
            entries.insert(JobType::Dataflow, DataflowFuture::new(client).into());
        }
        FutureRegistry { entries }
    }
}

/// Immutable-after-setup lookup from job type to future.
#[derive(Default, Clone)]
pub struct FutureRegistry {
    entries: BTreeMap<JobType, RegisteredFuture>,
}

impl FutureRegistry {
    /// An empty registry; see [`FutureRegistry::builder`] for the usual set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FutureRegistryBuilder {
        FutureRegistryBuilder::new()
    }

    pub fn register(&mut self, future: impl Into<RegisteredFuture>) -> Result<(), RegistryError> {
        let future = future.into();
        let job_type = future.job_type();
        if self.entries.contains_key(&job_type) {
            return Err(RegistryError::AlreadyRegistered(job_type));
        }
        self.entries.insert(job_type, future);
        Ok(())
    }

    /// Job types with a registered future, in stable order.
    pub fn job_types(&self) -> impl Iterator<Item = JobType> + '_ {
        self.entries.keys().copied()
    }

    /// Picks the future registered for the entry's `resource.type`.
    pub fn resolve(&self, event: &InboundEvent) -> Result<&RegisteredFuture, FutureError> {
        event
            .job_type()
            .and_then(|job_type| self.entries.get(&job_type))
            .ok_or_else(|| FutureError::UnsupportedJobType {
                resource_type: event.resource_type().to_string(),
            })
    }

    /// Routes the entry to its future and resolves it.
    pub async fn handle_message(&self, event: &InboundEvent) -> Result<Resolution, FutureError> {
        let span = info_span!(
            "future.handle",
            resource_type = %event.resource_type(),
            job_type = field::Empty,
            trigger_id = field::Empty,
        );
        async {
            let result = match self.resolve(event) {
                Ok(future) => {
                    let job_type = future.job_type();
                    tracing::Span::current().record("job_type", job_type.as_str());
                    future
                        .handle_message(event)
                        .await
                        .map(|resolution| (job_type, resolution))
                }
                Err(err) => Err(err),
            };

            match result {
                Ok((job_type, resolution)) => {
                    tracing::Span::current().record("trigger_id", resolution.trigger_id());
                    counter!(
                        MESSAGES_TOTAL,
                        "job_type" => job_type.as_str(),
                        "disposition" => resolution.disposition_label()
                    )
                    .increment(1);
                    info!(
                        disposition = resolution.disposition_label(),
                        "resolved job completion"
                    );
                    Ok(resolution)
                }
                Err(err) => {
                    counter!(ERRORS_TOTAL, "kind" => err.code()).increment(1);
                    warn!(
                        code = err.code(),
                        retryable = err.is_retryable(),
                        error = %err,
                        "could not resolve job completion"
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
