// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobStatus;
use crate::domain::models::metric::{
    clamp_duration_ms, DurationStatistic, ExecutionMetric, NewMetricSample,
};
use crate::domain::repositories::metric_repository::MetricRepository;
use crate::domain::repositories::RepositoryError;
use chrono::{DateTime, FixedOffset};
use metrics::counter;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 执行指标服务
///
/// 终态样本的追加与统计读取。追加是尽力而为的遥测路径：
/// 非终态或缺少队列/类名的样本静默丢弃，不报错。
pub struct ExecutionMetricsService<M: MetricRepository> {
    /// 指标仓库
    repository: Arc<M>,
}

impl<M: MetricRepository> ExecutionMetricsService<M> {
    /// 创建新的执行指标服务实例
    pub fn new(repository: Arc<M>) -> Self {
        Self { repository }
    }

    /// 追加终态样本
    ///
    /// # 参数
    ///
    /// * `sample` - 新样本，时长未钳制
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(ExecutionMetric))` - 已写入的样本
    /// * `Ok(None)` - 样本不合格被丢弃
    /// * `Err(RepositoryError)` - 仓库写入失败
    pub async fn append_sample(
        &self,
        sample: NewMetricSample,
    ) -> Result<Option<ExecutionMetric>, RepositoryError> {
        if !matches!(sample.status, JobStatus::Completed | JobStatus::Failed) {
            debug!(
                status = %sample.status,
                "Dropping non-terminal execution sample"
            );
            return Ok(None);
        }
        if sample.queue.trim().is_empty() || sample.job_class.trim().is_empty() {
            debug!("Dropping execution sample without queue or job class");
            return Ok(None);
        }

        let metric = ExecutionMetric {
            id: Uuid::new_v4(),
            queue: sample.queue,
            job_class: sample.job_class,
            status: sample.status,
            queue_wait_ms: sample.queue_wait_ms.and_then(clamp_duration_ms),
            processing_duration_ms: sample.processing_duration_ms.and_then(clamp_duration_ms),
            total_time_ms: sample.total_time_ms.and_then(clamp_duration_ms),
            retry_count: sample.retry_count,
            context: sample.context,
            recorded_at: sample.recorded_at,
        };

        let inserted = self.repository.insert(&metric).await?;
        counter!("execution_samples_total").increment(1);
        Ok(Some(inserted))
    }

    /// 统计窗口内某状态的样本数
    pub async fn count_since(
        &self,
        queue: &str,
        status: JobStatus,
        since: DateTime<FixedOffset>,
    ) -> Result<u64, RepositoryError> {
        self.repository.count_by_status_since(queue, status, since).await
    }

    /// 最近N个样本上某统计维度的百分位
    ///
    /// # 参数
    ///
    /// * `queue` - 队列名称
    /// * `statistic` - 统计维度
    /// * `percentile` - 百分位（0.0-100.0）
    /// * `since` - 回看窗口起点
    /// * `limit` - 样本条数上限
    pub async fn percentile(
        &self,
        queue: &str,
        statistic: DurationStatistic,
        percentile: f64,
        since: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Option<i64>, RepositoryError> {
        let samples = self.repository.recent_for_queue(queue, since, limit).await?;
        let mut values: Vec<i64> = samples
            .iter()
            .filter_map(|s| s.value_for(statistic))
            .collect();
        values.sort_unstable();
        Ok(percentile_of(&values, percentile))
    }
}

/// 已排序数列上的最近秩百分位
pub fn percentile_of(sorted: &[i64], percentile: f64) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let clamped = percentile.clamp(0.0, 100.0);
    let index = ((clamped / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted.get(index).copied()
}
