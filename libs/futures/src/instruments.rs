use metrics::describe_counter;

/// Resolutions produced, labelled by `job_type` and `disposition`.
pub const MESSAGES_TOTAL: &str = "jobwatch_messages_total";
/// Entries that could not be resolved, labelled by error `kind`.
pub const ERRORS_TOTAL: &str = "jobwatch_errors_total";

/// Registers help text for every jobwatch metric, status-query ones included.
pub fn describe_metrics() {
    describe_counter!(MESSAGES_TOTAL, "Log entries resolved to a completion or pending state");
    describe_counter!(ERRORS_TOTAL, "Log entries rejected with a future error");
    jobwatch_status::describe_metrics();
}
