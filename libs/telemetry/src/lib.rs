//! Tracing and OpenTelemetry setup shared by jobwatch binaries.
//!
//! Log output always goes to stderr so tools can keep stdout for their results. When OTLP export
//! is enabled, spans and the `metrics` facade counters both leave through the collector.

use anyhow::Result;

mod config;
mod recorder;
mod tracing_init;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use recorder::MeterRecorder;
pub use tracing_init::{TelemetryGuard, init_telemetry, with_job_fields};

/// Installs telemetry configured from the environment (`RUST_LOG`, `LOG_FORMAT`, OTLP vars).
/// Keep the returned guard alive until the process is done.
pub fn install(service_name: &str) -> Result<TelemetryGuard> {
    init_telemetry(&TelemetryConfig::from_env(
        service_name,
        env!("CARGO_PKG_VERSION"),
    ))
}
