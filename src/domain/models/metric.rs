// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobContext, JobStatus};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 时长样本上限：7天（毫秒）
///
/// 超出该值的样本视为时钟漂移或数据损坏，丢弃
pub const MAX_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// 钳制时长样本到 [0, 7天]
///
/// 负数或超限的跨度返回 `None`，绝不落库为负值
pub fn clamp_duration_ms(ms: i64) -> Option<i64> {
    if (0..=MAX_DURATION_MS).contains(&ms) {
        Some(ms)
    } else {
        None
    }
}

/// 可做百分位统计的时长维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationStatistic {
    /// 队列等待时长
    QueueWaitMs,
    /// 处理时长
    ProcessingDurationMs,
    /// 总时长
    TotalTimeMs,
}

/// 执行指标样本
///
/// 仅终态产生，一经写入不可变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetric {
    /// 样本唯一标识符
    pub id: Uuid,
    /// 队列名称
    pub queue: String,
    /// 任务类名
    pub job_class: String,
    /// 终态（completed|failed）
    pub status: JobStatus,
    /// 队列等待时长（毫秒）
    pub queue_wait_ms: Option<i64>,
    /// 处理时长（毫秒）
    pub processing_duration_ms: Option<i64>,
    /// 总时长（毫秒）
    pub total_time_ms: Option<i64>,
    /// 执行时的重试次数
    pub retry_count: i32,
    /// 作用域上下文
    pub context: JobContext,
    /// 记录时间
    pub recorded_at: DateTime<FixedOffset>,
}

impl ExecutionMetric {
    /// 按统计维度取值
    pub fn value_for(&self, statistic: DurationStatistic) -> Option<i64> {
        match statistic {
            DurationStatistic::QueueWaitMs => self.queue_wait_ms,
            DurationStatistic::ProcessingDurationMs => self.processing_duration_ms,
            DurationStatistic::TotalTimeMs => self.total_time_ms,
        }
    }
}

/// 新样本输入
#[derive(Debug, Clone)]
pub struct NewMetricSample {
    /// 队列名称
    pub queue: String,
    /// 任务类名
    pub job_class: String,
    /// 终态
    pub status: JobStatus,
    /// 队列等待时长（毫秒，未钳制）
    pub queue_wait_ms: Option<i64>,
    /// 处理时长（毫秒，未钳制）
    pub processing_duration_ms: Option<i64>,
    /// 总时长（毫秒，未钳制）
    pub total_time_ms: Option<i64>,
    /// 重试次数
    pub retry_count: i32,
    /// 作用域上下文
    pub context: JobContext,
    /// 记录时间
    pub recorded_at: DateTime<FixedOffset>,
}

impl NewMetricSample {
    /// 创建一个新样本输入
    pub fn new(queue: &str, job_class: &str, status: JobStatus) -> Self {
        Self {
            queue: queue.to_string(),
            job_class: job_class.to_string(),
            status,
            queue_wait_ms: None,
            processing_duration_ms: None,
            total_time_ms: None,
            retry_count: 0,
            context: JobContext::default(),
            recorded_at: Utc::now().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rejects_negative_spans() {
        assert_eq!(clamp_duration_ms(-1), None);
        assert_eq!(clamp_duration_ms(-50_000), None);
    }

    #[test]
    fn test_clamp_rejects_over_seven_days() {
        assert_eq!(clamp_duration_ms(MAX_DURATION_MS + 1), None);
    }

    #[test]
    fn test_clamp_keeps_sane_values() {
        assert_eq!(clamp_duration_ms(0), Some(0));
        assert_eq!(clamp_duration_ms(12_345), Some(12_345));
        assert_eq!(clamp_duration_ms(MAX_DURATION_MS), Some(MAX_DURATION_MS));
    }
}
