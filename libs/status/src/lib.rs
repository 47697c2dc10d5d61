//! Status query clients used by futures whose completion log entry does not carry a verdict.
//!
//! The [`JobStatusClient`] trait is the only seam the futures depend on. [`DataflowStatusClient`]
//! talks to the Dataflow REST API; [`StaticStatusClient`] answers from memory for tests and dry
//! runs.

pub mod client;
pub mod config;
pub mod dataflow;
pub mod instruments;
pub mod mock;

pub use client::{JobStatusClient, SharedStatusClient, StatusQuery, StatusQueryError};
pub use config::{ConfigError, StatusClientConfig};
pub use dataflow::DataflowStatusClient;
pub use instruments::{STATUS_QUERY_ERRORS_TOTAL, STATUS_QUERY_SECONDS, describe_metrics};
pub use mock::StaticStatusClient;
