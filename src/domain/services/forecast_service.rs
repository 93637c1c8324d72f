// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ForecastSettings;
use crate::domain::models::forecast::{round_seconds, Confidence, QueueEstimate};
use crate::domain::models::job::JobStatus;
use crate::domain::repositories::metric_repository::MetricRepository;
use crate::domain::services::metrics_service::percentile_of;
use crate::infrastructure::cache::ttl_cache::TtlCache;
use crate::queue::backend::{QueueBackend, WorkerInfo};
use crate::utils::fallback::first_present;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::warn;

/// 队列预测服务
///
/// 读取实时队列深度与历史终态样本，产出每项ETA与清空时间。
/// 任何输入源失败都退化为保守的兜底估计，不向仪表盘抛错。
/// 快照按后端+队列集合做短TTL缓存，吸收仪表盘轮询。
pub struct ForecastService<M: MetricRepository, B: QueueBackend> {
    /// 指标仓库
    metrics: Arc<M>,
    /// 队列后端
    backend: Arc<B>,
    /// 快照缓存
    cache: Arc<TtlCache<Vec<QueueEstimate>>>,
    /// 预测配置
    settings: ForecastSettings,
}

impl<M: MetricRepository, B: QueueBackend> ForecastService<M, B> {
    /// 创建新的队列预测服务实例
    pub fn new(
        metrics: Arc<M>,
        backend: Arc<B>,
        cache: Arc<TtlCache<Vec<QueueEstimate>>>,
        settings: ForecastSettings,
    ) -> Self {
        Self {
            metrics,
            backend,
            cache,
            settings,
        }
    }

    /// 单个队列的预测
    pub async fn estimate(&self, queue: &str) -> Option<QueueEstimate> {
        self.snapshot(&[queue.to_string()], false)
            .await
            .into_iter()
            .next()
    }

    /// 一组队列的预测快照
    ///
    /// # 参数
    ///
    /// * `queues` - 队列名称集合
    /// * `force` - 跳过缓存强制重算
    pub async fn snapshot(&self, queues: &[String], force: bool) -> Vec<QueueEstimate> {
        let key = format!("snapshot:{}", queues.join(","));
        if !force {
            if let Some(cached) = self.cache.get(&key) {
                counter!("forecast_cache_hits_total").increment(1);
                return cached;
            }
        }

        let estimates =
            futures::future::join_all(queues.iter().map(|queue| self.compute_estimate(queue)))
                .await;
        self.cache.insert(&key, estimates.clone());
        estimates
    }

    /// 重算单个队列的预测
    ///
    /// 不可失败：每个输入源出错时各自退回零值/空集，
    /// 最终至少给出低置信度的兜底估计
    async fn compute_estimate(&self, queue: &str) -> QueueEstimate {
        let queue_size = match self.backend.queue_depth(queue).await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(queue = %queue, "Queue depth unavailable: {}", e);
                0
            }
        };
        let queue_latency_ms = match self.backend.queue_latency_ms(queue).await {
            Ok(latency) => latency,
            Err(e) => {
                warn!(queue = %queue, "Queue latency unavailable: {}", e);
                None
            }
        };

        let since: DateTime<FixedOffset> =
            (Utc::now() - Duration::hours(self.settings.lookback_hours)).into();
        let samples = match self
            .metrics
            .recent_for_queue(queue, since, self.settings.sample_limit)
            .await
        {
            Ok(samples) => samples,
            Err(e) => {
                warn!(queue = %queue, "Metric samples unavailable: {}", e);
                Vec::new()
            }
        };

        let mut processing: Vec<i64> = samples
            .iter()
            .filter_map(|s| s.processing_duration_ms)
            .collect();
        processing.sort_unstable();
        let mut waits: Vec<i64> = samples.iter().filter_map(|s| s.queue_wait_ms).collect();
        waits.sort_unstable();

        let median_processing_ms = percentile_of(&processing, 50.0);
        let p90_processing_ms = percentile_of(&processing, 90.0);
        let median_queue_wait_ms = percentile_of(&waits, 50.0);

        let hour_ago: DateTime<FixedOffset> = (Utc::now() - Duration::hours(1)).into();
        let completed_last_hour = match self
            .metrics
            .count_by_status_since(queue, JobStatus::Completed, hour_ago)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(queue = %queue, "Throughput count unavailable: {}", e);
                0
            }
        };

        let workers = match self.backend.workers().await {
            Ok(workers) => workers,
            Err(e) => {
                warn!("Worker introspection unavailable: {}", e);
                Vec::new()
            }
        };
        let effective_concurrency = effective_concurrency_for(&workers, queue);

        // 中位数 → 吞吐推算 → 固定兜底，按可信度排序回退
        let per_item_ms = first_present([
            (samples.len() >= self.settings.min_samples)
                .then_some(median_processing_ms)
                .flatten(),
            (completed_last_hour > 0).then(|| 3_600_000 / completed_last_hour as i64),
        ])
        .unwrap_or(self.settings.default_per_item_ms);

        // 队首那一项正在被处理，等待队列不含它
        let backlog_items = queue_size.saturating_sub(1);
        let per_item_seconds = per_item_ms as f64 / 1000.0;
        let estimated_wait_seconds =
            round_seconds(backlog_items as f64 / effective_concurrency * per_item_seconds);
        let estimated_total_seconds = round_seconds(estimated_wait_seconds + per_item_seconds);
        let estimated_drain_seconds =
            round_seconds(queue_size as f64 / effective_concurrency * per_item_seconds);

        QueueEstimate {
            queue: queue.to_string(),
            queue_size,
            queue_latency_ms,
            sample_size: samples.len(),
            completed_last_hour,
            median_processing_ms,
            p90_processing_ms,
            median_queue_wait_ms,
            effective_concurrency,
            per_item_ms,
            estimated_wait_seconds,
            estimated_total_seconds,
            estimated_drain_seconds,
            confidence: self.confidence_for(samples.len(), completed_last_hour),
            generated_at: Utc::now().into(),
        }
    }

    /// 样本量与吞吐到置信度的映射
    ///
    /// 两个维度都单调：增加样本或吞吐不会降低置信度
    fn confidence_for(&self, sample_size: usize, completed_last_hour: u64) -> Confidence {
        if sample_size >= self.settings.high_confidence_samples
            && completed_last_hour >= self.settings.high_confidence_hourly
        {
            Confidence::High
        } else if sample_size >= self.settings.min_samples
            && completed_last_hour >= self.settings.medium_confidence_hourly
        {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// 某队列的有效并发
///
/// 服务该队列的每个工作器贡献 并发度/所服务队列数，
/// 和值下限1.0避免除法爆炸
pub fn effective_concurrency_for(workers: &[WorkerInfo], queue: &str) -> f64 {
    let total: f64 = workers
        .iter()
        .filter(|w| w.queues.iter().any(|q| q == queue))
        .map(|w| w.concurrency as f64 / w.queues.len().max(1) as f64)
        .sum();
    total.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::JobContext;
    use crate::domain::models::metric::ExecutionMetric;
    use crate::domain::repositories::RepositoryError;
    use crate::infrastructure::cache::ttl_cache::{ManualClock, SystemClock};
    use crate::queue::backend::{
        DispatchRequest, DispatchedJob, InFlightState, QueueError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct StubMetricRepository {
        samples: Vec<ExecutionMetric>,
        completed_last_hour: u64,
        fetches: AtomicUsize,
    }

    impl StubMetricRepository {
        fn with_processing_samples(durations: &[i64], completed_last_hour: u64) -> Self {
            let samples = durations
                .iter()
                .map(|&ms| ExecutionMetric {
                    id: Uuid::new_v4(),
                    queue: "media".to_string(),
                    job_class: "MediaEncodeJob".to_string(),
                    status: JobStatus::Completed,
                    queue_wait_ms: Some(500),
                    processing_duration_ms: Some(ms),
                    total_time_ms: Some(ms + 500),
                    retry_count: 0,
                    context: JobContext::default(),
                    recorded_at: Utc::now().into(),
                })
                .collect();
            Self {
                samples,
                completed_last_hour,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricRepository for StubMetricRepository {
        async fn insert(
            &self,
            metric: &ExecutionMetric,
        ) -> Result<ExecutionMetric, RepositoryError> {
            Ok(metric.clone())
        }

        async fn recent_for_queue(
            &self,
            _queue: &str,
            _since: DateTime<FixedOffset>,
            _limit: u64,
        ) -> Result<Vec<ExecutionMetric>, RepositoryError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.samples.clone())
        }

        async fn count_by_status_since(
            &self,
            _queue: &str,
            _status: JobStatus,
            _since: DateTime<FixedOffset>,
        ) -> Result<u64, RepositoryError> {
            Ok(self.completed_last_hour)
        }
    }

    struct StubQueueBackend {
        depth: u64,
        workers: Vec<WorkerInfo>,
    }

    #[async_trait]
    impl QueueBackend for StubQueueBackend {
        async fn queue_depth(&self, _queue: &str) -> Result<u64, QueueError> {
            Ok(self.depth)
        }

        async fn queue_latency_ms(&self, _queue: &str) -> Result<Option<i64>, QueueError> {
            Ok(Some(1_000))
        }

        async fn enqueued_at(
            &self,
            _job_id: Uuid,
        ) -> Result<Option<DateTime<FixedOffset>>, QueueError> {
            Ok(None)
        }

        async fn find_in_flight(
            &self,
            _job_id: Uuid,
        ) -> Result<Option<InFlightState>, QueueError> {
            Ok(None)
        }

        async fn workers(&self) -> Result<Vec<WorkerInfo>, QueueError> {
            Ok(self.workers.clone())
        }

        async fn dispatch(&self, _request: DispatchRequest) -> Result<DispatchedJob, QueueError> {
            Err(QueueError::Unavailable("stub".to_string()))
        }
    }

    fn settings() -> ForecastSettings {
        ForecastSettings {
            lookback_hours: 24,
            sample_limit: 500,
            cache_ttl_seconds: 20,
            default_per_item_ms: 30_000,
            min_samples: 8,
            high_confidence_samples: 60,
            high_confidence_hourly: 12,
            medium_confidence_hourly: 3,
        }
    }

    fn worker(concurrency: u32, queues: &[&str]) -> WorkerInfo {
        WorkerInfo {
            id: Uuid::new_v4(),
            hostname: "worker-1".to_string(),
            concurrency,
            queues: queues.iter().map(|q| q.to_string()).collect(),
        }
    }

    #[test]
    fn test_effective_concurrency_splits_across_queues() {
        let workers = vec![worker(4, &["media", "analysis"]), worker(2, &["media"])];
        // 4/2 + 2/1 = 4.0
        assert_eq!(effective_concurrency_for(&workers, "media"), 4.0);
    }

    #[test]
    fn test_effective_concurrency_floors_at_one() {
        assert_eq!(effective_concurrency_for(&[], "media"), 1.0);
        let workers = vec![worker(1, &["a", "b", "c", "media"])];
        assert_eq!(effective_concurrency_for(&workers, "media"), 1.0);
    }

    #[tokio::test]
    async fn test_drain_estimate_scenario() {
        // 队列深度50，有效并发2，处理中位数10秒 → 清空约250秒
        let durations = vec![10_000; 20];
        let metrics = Arc::new(StubMetricRepository::with_processing_samples(&durations, 30));
        let backend = Arc::new(StubQueueBackend {
            depth: 50,
            workers: vec![worker(2, &["media"])],
        });
        let cache = Arc::new(TtlCache::new(
            Duration::seconds(20),
            Arc::new(SystemClock),
        ));
        let service = ForecastService::new(metrics, backend, cache, settings());

        let estimate = service.estimate("media").await.expect("estimate");
        assert_eq!(estimate.effective_concurrency, 2.0);
        assert_eq!(estimate.per_item_ms, 10_000);
        assert_eq!(estimate.estimated_drain_seconds, 250.0);
        // 等待队列不含队首项：49/2*10 = 245
        assert_eq!(estimate.estimated_wait_seconds, 245.0);
        assert_eq!(estimate.estimated_total_seconds, 255.0);
    }

    #[tokio::test]
    async fn test_per_item_falls_back_to_throughput_then_default() {
        // 样本不足，走吞吐推算：3_600_000 / 60 = 60_000
        let metrics = Arc::new(StubMetricRepository::with_processing_samples(&[5_000], 60));
        let backend = Arc::new(StubQueueBackend {
            depth: 3,
            workers: vec![],
        });
        let cache = Arc::new(TtlCache::new(Duration::seconds(20), Arc::new(SystemClock)));
        let service = ForecastService::new(metrics, backend, cache, settings());
        let estimate = service.estimate("media").await.unwrap();
        assert_eq!(estimate.per_item_ms, 60_000);

        // 既无样本也无吞吐，落到固定兜底
        let metrics = Arc::new(StubMetricRepository::with_processing_samples(&[], 0));
        let backend = Arc::new(StubQueueBackend {
            depth: 0,
            workers: vec![],
        });
        let cache = Arc::new(TtlCache::new(Duration::seconds(20), Arc::new(SystemClock)));
        let service = ForecastService::new(metrics, backend, cache, settings());
        let estimate = service.estimate("media").await.unwrap();
        assert_eq!(estimate.per_item_ms, 30_000);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_confidence_tiers_are_monotonic() {
        let cases = [
            (0usize, 0u64, Confidence::Low),
            (8, 3, Confidence::Medium),
            (8, 12, Confidence::Medium),
            (60, 3, Confidence::Medium),
            (60, 12, Confidence::High),
            (200, 50, Confidence::High),
        ];
        for (sample_size, hourly, expected) in cases {
            let durations = vec![1_000; sample_size];
            let metrics = Arc::new(StubMetricRepository::with_processing_samples(
                &durations, hourly,
            ));
            let backend = Arc::new(StubQueueBackend {
                depth: 1,
                workers: vec![],
            });
            let cache = Arc::new(TtlCache::new(Duration::seconds(20), Arc::new(SystemClock)));
            let service = ForecastService::new(metrics, backend, cache, settings());
            let estimate = service.estimate("media").await.unwrap();
            assert_eq!(
                estimate.confidence, expected,
                "samples={} hourly={}",
                sample_size, hourly
            );
        }
    }

    #[tokio::test]
    async fn test_snapshot_serves_from_cache_until_ttl() {
        let metrics = Arc::new(StubMetricRepository::with_processing_samples(
            &[10_000; 10],
            10,
        ));
        let backend = Arc::new(StubQueueBackend {
            depth: 5,
            workers: vec![],
        });
        let clock = Arc::new(ManualClock::starting_at(Utc::now()));
        let cache = Arc::new(TtlCache::new(Duration::seconds(20), clock.clone()));
        let service = ForecastService::new(metrics.clone(), backend, cache, settings());

        let queues = vec!["media".to_string()];
        service.snapshot(&queues, false).await;
        service.snapshot(&queues, false).await;
        assert_eq!(metrics.fetches.load(Ordering::SeqCst), 1);

        // 强制刷新绕过缓存
        service.snapshot(&queues, true).await;
        assert_eq!(metrics.fetches.load(Ordering::SeqCst), 2);

        // TTL过期后重算
        clock.advance(Duration::seconds(21));
        service.snapshot(&queues, false).await;
        assert_eq!(metrics.fetches.load(Ordering::SeqCst), 3);
    }
}
