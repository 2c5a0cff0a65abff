// Prometheus metrics for the HTTP service

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Run-mode executions by outcome
    pub static ref EXECUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codebank_executions_total",
        "Run-mode executions by outcome",
        &["outcome"]
    )
    .expect("Failed to register codebank_executions_total");

    /// Graded submissions by outcome
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codebank_submissions_total",
        "Submissions by outcome",
        &["outcome"]
    )
    .expect("Failed to register codebank_submissions_total");

    pub static ref GRADING_DURATION: Histogram = register_histogram!(
        "codebank_grading_duration_seconds",
        "Wall time spent grading one submission",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register codebank_grading_duration_seconds");
}

pub fn record_execution(outcome: &str) {
    EXECUTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_submission(outcome: &str) {
    SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
