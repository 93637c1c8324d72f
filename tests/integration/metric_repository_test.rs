use super::helpers::test_db;
use chrono::{Duration, Utc};
use jobpulse::domain::models::job::JobStatus;
use jobpulse::domain::models::metric::{DurationStatistic, NewMetricSample};
use jobpulse::domain::services::metrics_service::ExecutionMetricsService;
use jobpulse::infrastructure::repositories::metric_repo_impl::MetricRepositoryImpl;
use std::sync::Arc;

#[tokio::test]
async fn test_append_and_percentile_reads() {
    let db = test_db().await;
    let service = ExecutionMetricsService::new(Arc::new(MetricRepositoryImpl::new(db)));

    for ms in [1_000i64, 2_000, 3_000, 4_000, 5_000] {
        let mut sample = NewMetricSample::new("media", "MediaEncodeJob", JobStatus::Completed);
        sample.processing_duration_ms = Some(ms);
        sample.queue_wait_ms = Some(ms / 10);
        sample.total_time_ms = Some(ms + ms / 10);
        let stored = service.append_sample(sample).await.unwrap();
        assert!(stored.is_some());
    }

    let since = (Utc::now() - Duration::hours(1)).into();
    let median = service
        .percentile("media", DurationStatistic::ProcessingDurationMs, 50.0, since, 100)
        .await
        .unwrap();
    assert_eq!(median, Some(3_000));

    let completed = service
        .count_since("media", JobStatus::Completed, since)
        .await
        .unwrap();
    assert_eq!(completed, 5);
    let failed = service
        .count_since("media", JobStatus::Failed, since)
        .await
        .unwrap();
    assert_eq!(failed, 0);
}

#[tokio::test]
async fn test_non_terminal_and_corrupt_samples_dropped() {
    let db = test_db().await;
    let service = ExecutionMetricsService::new(Arc::new(MetricRepositoryImpl::new(db)));

    // 非终态样本被丢弃
    let running = NewMetricSample::new("media", "MediaEncodeJob", JobStatus::Running);
    assert!(service.append_sample(running).await.unwrap().is_none());

    // 空队列名被丢弃
    let blank = NewMetricSample::new("  ", "MediaEncodeJob", JobStatus::Completed);
    assert!(service.append_sample(blank).await.unwrap().is_none());

    // 负时长落库为None而不是负数
    let mut skewed = NewMetricSample::new("media", "MediaEncodeJob", JobStatus::Failed);
    skewed.processing_duration_ms = Some(-5_000);
    let stored = service.append_sample(skewed).await.unwrap().unwrap();
    assert_eq!(stored.processing_duration_ms, None);
}
