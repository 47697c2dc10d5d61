use std::env;
use std::time::Duration;

const DEFAULT_METRIC_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryProtocol {
    Grpc,
    HttpProtobuf,
}

impl TelemetryProtocol {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" | "http/protobuf" => TelemetryProtocol::HttpProtobuf,
            _ => TelemetryProtocol::Grpc,
        }
    }
}

/// Export and log-format settings, read from the standard OTel variables plus `LOG_FORMAT`,
/// `ENABLE_OTEL` and `DEPLOYMENT_ENV`.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub endpoint: String,
    pub protocol: TelemetryProtocol,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub json_logs: bool,
    pub enabled: bool,
    /// How often metrics are pushed (`OTEL_METRIC_EXPORT_INTERVAL`, milliseconds).
    pub metric_interval: Duration,
}

impl TelemetryConfig {
    pub fn from_env(service_name: &str, service_version: &str) -> Self {
        Self::from_lookup(service_name, service_version, |name| env::var(name).ok())
    }

    pub fn from_lookup<F>(service_name: &str, service_version: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let enabled = lookup("ENABLE_OTEL").is_some_and(|value| is_truthy(&value));

        Self {
            protocol: lookup("OTEL_EXPORTER_OTLP_PROTOCOL")
                .map(|value| TelemetryProtocol::parse(&value))
                .unwrap_or(TelemetryProtocol::Grpc),
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| service_name.to_string()),
            service_version: lookup("OTEL_SERVICE_VERSION")
                .unwrap_or_else(|| service_version.to_string()),
            environment: lookup("OTEL_RESOURCE_ATTRIBUTES")
                .and_then(|attributes| deployment_environment(&attributes))
                .or_else(|| lookup("DEPLOYMENT_ENV"))
                .unwrap_or_else(|| "dev".into()),
            json_logs: lookup("LOG_FORMAT").is_none_or(|format| is_json_format(&format)),
            enabled: enabled && !endpoint.is_empty(),
            metric_interval: lookup("OTEL_METRIC_EXPORT_INTERVAL")
                .and_then(|millis| millis.trim().parse::<u64>().ok())
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_METRIC_INTERVAL),
            endpoint,
        }
    }

    pub fn exporter_enabled(&self) -> bool {
        self.enabled && !self.endpoint.is_empty()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn is_json_format(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "text" | "pretty" | "plain"
    )
}

fn deployment_environment(attributes: &str) -> Option<String> {
    attributes
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == "deployment.environment")
        .map(|(_, value)| value.trim().to_string())
}
