//! Prometheus metrics for document store traffic (default registry).

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

pub static STORE_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "carto_store_operations_total",
        "Document store calls by operation and outcome",
        &["op", "outcome"]
    )
    .expect("register store_operations_total")
});

pub static STORE_OPERATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "carto_store_operation_seconds",
        "Document store call latency in seconds",
        &["op"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("register store_operation_seconds")
});

/// Record one finished store call.
pub fn observe_store_op(op: &str, ok: bool, seconds: f64) {
    let outcome = if ok { "ok" } else { "error" };
    STORE_OPERATIONS_TOTAL.with_label_values(&[op, outcome]).inc();
    STORE_OPERATION_SECONDS.with_label_values(&[op]).observe(seconds);
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_ops_show_up_in_render() {
        observe_store_op("get", true, 0.002);
        observe_store_op("get", false, 0.010);
        let text = render();
        assert!(text.contains("carto_store_operations_total"));
        assert!(text.contains("outcome=\"error\""));
    }
}
