//! Core metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `_total` suffix for counters
//! - `_seconds` suffix for histograms measuring duration

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register all core metrics with descriptions.
pub fn register_core_metrics() {
    describe_counter!("berth_stack_deploys_total", "Total number of successful stack deploys");
    describe_counter!(
        "berth_stack_deploy_failures_total",
        "Total number of failed stack deploys (by stage)"
    );
    describe_histogram!("berth_deploy_duration_seconds", "Wall time of successful deploys");
    describe_counter!(
        "berth_rollback_containers_total",
        "Containers removed or restored by deploy rollback (by outcome)"
    );
    describe_counter!(
        "berth_teardown_failures_total",
        "Per-resource failures during stop/remove (by kind)"
    );
    describe_counter!(
        "berth_platform_timeouts_total",
        "Platform calls that exceeded their deadline (by operation)"
    );
}

pub fn record_deploy(duration_secs: f64) {
    histogram!("berth_deploy_duration_seconds").record(duration_secs);
    counter!("berth_stack_deploys_total").increment(1);
}

pub fn record_deploy_failure(stage: &'static str) {
    counter!("berth_stack_deploy_failures_total", "stage" => stage).increment(1);
}

pub fn record_rollback(outcome: &'static str) {
    counter!("berth_rollback_containers_total", "outcome" => outcome).increment(1);
}

pub fn record_teardown_failures(kind: &'static str, count: usize) {
    if count > 0 {
        counter!("berth_teardown_failures_total", "kind" => kind).increment(count as u64);
    }
}

pub fn record_platform_timeout(operation: &'static str) {
    counter!("berth_platform_timeouts_total", "operation" => operation).increment(1);
}
