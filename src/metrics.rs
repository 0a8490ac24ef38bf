use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref BATTLES_CREATED_TOTAL: IntCounter = register_int_counter!(
        "battles_created_total",
        "Total number of battle challenges created"
    )
    .unwrap();

    pub static ref BATTLES_COMPLETED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "battles_completed_total",
        "Total number of battles completed",
        &["outcome"]
    )
    .unwrap();

    pub static ref BATTLE_SUBMISSIONS_TOTAL: IntCounter = register_int_counter!(
        "battle_submissions_total",
        "Total number of accepted battle answer submissions"
    )
    .unwrap();

    pub static ref QUIZ_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        "quiz_attempts_total",
        "Total number of solo quiz submissions"
    )
    .unwrap();

    pub static ref QUIZ_ANSWERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_answers_total",
        "Total number of solo quiz answers scored",
        &["correct"]
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Record a completed battle with its outcome label ("win" or "tie")
pub fn record_battle_completed(tied: bool) {
    let outcome = if tied { "tie" } else { "win" };
    BATTLES_COMPLETED_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record scored solo answers split by correctness
pub fn record_quiz_answers(correct: u64, incorrect: u64) {
    QUIZ_ANSWERS_TOTAL
        .with_label_values(&["true"])
        .inc_by(correct);
    QUIZ_ANSWERS_TOTAL
        .with_label_values(&["false"])
        .inc_by(incorrect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metrics() {
        BATTLES_CREATED_TOTAL.inc();
        let out = render_metrics().unwrap();
        assert!(out.contains("battles_created_total"));
    }
}
