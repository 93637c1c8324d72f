// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::system::resources::{ResourceProbe, SysinfoResourceProbe};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Duration;
use tracing::warn;

/// 初始化指标系统
///
/// 配置并注册应用所需的各类监控指标
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();

    // Ignore error if a recorder is already installed (for development/testing)
    if let Err(e) = builder.install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
    }

    // Start background task to update system metrics
    tokio::spawn(async move {
        let probe = SysinfoResourceProbe;
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            update_system_metrics(&probe);
        }
    });

    // Register metrics
    describe_gauge!("system_load_per_core", "1-minute load average per CPU core");
    describe_gauge!(
        "system_available_memory_mb",
        "Available system memory in megabytes"
    );
    describe_counter!(
        "job_transitions_applied_total",
        "Total number of job transitions applied to lifecycle records"
    );
    describe_counter!(
        "job_transitions_stale_total",
        "Total number of stale job transitions discarded"
    );
    describe_counter!(
        "job_transitions_ignored_total",
        "Total number of transitions ignored for unknown statuses"
    );
    describe_counter!(
        "execution_samples_total",
        "Total number of terminal execution samples appended"
    );
    describe_counter!(
        "job_failures_recorded_total",
        "Total number of job failures recorded"
    );
    describe_counter!(
        "retries_enqueued_total",
        "Total number of retries dispatched"
    );
    describe_counter!(
        "retries_skipped_total",
        "Total number of retry candidates skipped by precondition checks"
    );
    describe_counter!(
        "admission_deferred_total",
        "Total number of tasks deferred by the admission guard"
    );
    describe_counter!(
        "forecast_cache_hits_total",
        "Total number of forecast snapshots served from cache"
    );
    describe_counter!("issues_opened_total", "Total number of issues opened");
    describe_counter!("issues_resolved_total", "Total number of issues resolved");
}

fn update_system_metrics(probe: &SysinfoResourceProbe) {
    match probe.snapshot() {
        Ok(snapshot) => {
            gauge!("system_load_per_core").set(snapshot.load_per_core());
            gauge!("system_available_memory_mb").set(snapshot.available_memory_mb as f64);
        }
        Err(e) => {
            warn!("Failed to refresh system metrics: {}", e);
        }
    }
}
