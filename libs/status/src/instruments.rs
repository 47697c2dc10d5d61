use metrics::{Unit, describe_counter, describe_histogram};

/// Latency of one jobs API call, labelled by `endpoint` and HTTP `status`.
pub const STATUS_QUERY_SECONDS: &str = "jobwatch_status_query_seconds";
/// Failed jobs API calls, labelled by `kind`, `endpoint` and (for rejections) `status`.
pub const STATUS_QUERY_ERRORS_TOTAL: &str = "jobwatch_status_query_errors_total";

pub(crate) const DATAFLOW_JOBS_GET: &str = "dataflow.jobs.get";

/// Registers units and help text with whichever recorder is installed.
pub fn describe_metrics() {
    describe_histogram!(
        STATUS_QUERY_SECONDS,
        Unit::Seconds,
        "Latency of job-management API status queries"
    );
    describe_counter!(
        STATUS_QUERY_ERRORS_TOTAL,
        "Status queries that failed in transport or were rejected by the API"
    );
}
