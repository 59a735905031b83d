//! Product Ranking Metrics
//!
//! Prometheus metrics for the ranking reads and the rollup pipeline

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};
use std::time::Duration;

static JOB_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "product_ranking_job_runs_total",
        "Total ranking pipeline runs (success/error)",
        &["status"]
    )
    .expect("Failed to register product ranking job runs metric")
});

static STAGE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "product_ranking_stage_duration_seconds",
        "Duration of ranking pipeline stages",
        &["stage"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register product ranking stage duration metric")
});

static ROWS_WRITTEN_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "product_ranking_rows_written_total",
        "Ranking ledger rows upserted",
        &["period", "outcome"]
    )
    .expect("Failed to register product ranking rows written metric")
});

static GATE_SKIPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "product_ranking_gate_skips_total",
        "Rollup branches skipped by their calendar gate",
        &["branch"]
    )
    .expect("Failed to register product ranking gate skips metric")
});

static DEGRADED_READS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "product_ranking_degraded_reads_total",
        "Live ranking reads answered with an empty result after a store failure",
        &["operation"]
    )
    .expect("Failed to register product ranking degraded reads metric")
});

/// Record pipeline run result (success/error)
pub fn record_job_run(status: &str) {
    JOB_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_stage_duration(stage: &str, duration: Duration) {
    STAGE_DURATION_SECONDS
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
}

/// `outcome` is "inserted" or "updated"
pub fn record_rows_written(period: &str, outcome: &str, count: u64) {
    ROWS_WRITTEN_TOTAL
        .with_label_values(&[period, outcome])
        .inc_by(count);
}

pub fn record_gate_skip(branch: &str) {
    GATE_SKIPS_TOTAL.with_label_values(&[branch]).inc();
}

pub fn record_degraded_read(operation: &str) {
    DEGRADED_READS_TOTAL.with_label_values(&[operation]).inc();
}
