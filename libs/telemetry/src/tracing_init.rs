use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::SdkTracerProvider,
};
use tracing::{Span, Subscriber};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{TelemetryConfig, TelemetryProtocol};
use crate::recorder::MeterRecorder;

const METER_NAME: &str = "jobwatch";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Owns the export pipelines. Dropping it flushes pending spans and metrics, which matters for
/// short-lived processes such as the CLI.
#[must_use = "dropping the guard stops telemetry export"]
#[derive(Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryGuard {
    /// Whether spans and metrics leave the process over OTLP.
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some() || self.meter_provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // The subscriber may already be gone at this point, so failures go straight to stderr.
        if let Some(provider) = self.meter_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("jobwatch telemetry: metric export shutdown failed: {err}");
            }
        }
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("jobwatch telemetry: span export shutdown failed: {err}");
            }
        }
    }
}

/// Installs the global subscriber and, when configured, the OTLP span exporter plus a `metrics`
/// recorder feeding the OTLP metric exporter. Later calls return an inert guard.
pub fn init_telemetry(cfg: &TelemetryConfig) -> Result<TelemetryGuard> {
    if INSTALLED.get().is_some() {
        return Ok(TelemetryGuard::default());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let guard = if cfg.exporter_enabled() {
        let resource = service_resource(cfg);
        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_batch_exporter(span_exporter(cfg)?)
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource)
            .with_reader(
                PeriodicReader::builder(metric_exporter(cfg)?)
                    .with_interval(cfg.metric_interval)
                    .build(),
            )
            .build();

        metrics::set_global_recorder(MeterRecorder::new(meter_provider.meter(METER_NAME)))
            .map_err(|_| anyhow!("a metrics recorder is already installed"))?;
        global::set_text_map_propagator(TraceContextPropagator::new());
        global::set_meter_provider(meter_provider.clone());

        let tracer = tracer_provider.tracer(cfg.service_name.clone());
        global::set_tracer_provider(tracer_provider.clone());
        tracing_subscriber::registry()
            .with(filter)
            .with(log_layer(cfg))
            .with(OpenTelemetryLayer::new(tracer))
            .try_init()
            .context("tracing subscriber already installed")?;

        TelemetryGuard {
            tracer_provider: Some(tracer_provider),
            meter_provider: Some(meter_provider),
        }
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(log_layer(cfg))
            .try_init()
            .context("tracing subscriber already installed")?;
        TelemetryGuard::default()
    };

    INSTALLED.set(()).ok();
    Ok(guard)
}

/// Records job context on a span declared with `job_type` / `trigger_id` fields.
pub fn with_job_fields(span: &Span, job_type: &str, trigger_id: Option<&str>) {
    span.record("job_type", tracing::field::display(job_type));
    if let Some(trigger_id) = trigger_id {
        span.record("trigger_id", tracing::field::display(trigger_id));
    }
}

// Logs go to stderr; stdout belongs to the tool's own output.
fn log_layer<S>(cfg: &TelemetryConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if cfg.json_logs {
        layer.json().flatten_event(true).boxed()
    } else {
        layer.boxed()
    }
}

fn span_exporter(cfg: &TelemetryConfig) -> Result<SpanExporter> {
    let exporter = match cfg.protocol {
        TelemetryProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(cfg.endpoint.clone())
            .build(),
        TelemetryProtocol::HttpProtobuf => SpanExporter::builder()
            .with_http()
            .with_endpoint(cfg.endpoint.clone())
            .build(),
    };
    exporter.with_context(|| format!("building OTLP span exporter for {}", cfg.endpoint))
}

fn metric_exporter(cfg: &TelemetryConfig) -> Result<MetricExporter> {
    let exporter = match cfg.protocol {
        TelemetryProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(cfg.endpoint.clone())
            .build(),
        TelemetryProtocol::HttpProtobuf => MetricExporter::builder()
            .with_http()
            .with_endpoint(cfg.endpoint.clone())
            .build(),
    };
    exporter.with_context(|| format!("building OTLP metric exporter for {}", cfg.endpoint))
}

fn service_resource(cfg: &TelemetryConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(cfg.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", cfg.service_version.clone()),
            KeyValue::new("deployment.environment", cfg.environment.clone()),
        ])
        .build()
}
