// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;

/// 预测置信度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// 低：样本不足，预测退化为兜底常量
    Low,
    /// 中：样本量达到下限
    Medium,
    /// 高：样本充足且吞吐稳定
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// 队列预测快照
///
/// 按需重算的即时统计视图，不落库
#[derive(Debug, Clone, Serialize)]
pub struct QueueEstimate {
    /// 队列名称
    pub queue: String,
    /// 当前队列深度
    pub queue_size: u64,
    /// 最老待执行项的实时等待（毫秒），后端不可用时为 `None`
    pub queue_latency_ms: Option<i64>,
    /// 参与统计的样本量
    pub sample_size: usize,
    /// 最近一小时完成数
    pub completed_last_hour: u64,
    /// 处理时长中位数（毫秒）
    pub median_processing_ms: Option<i64>,
    /// 处理时长P90（毫秒）
    pub p90_processing_ms: Option<i64>,
    /// 队列等待中位数（毫秒）
    pub median_queue_wait_ms: Option<i64>,
    /// 有效并发（分配到该队列的工作器并发份额之和）
    pub effective_concurrency: f64,
    /// 单项预计耗时（毫秒）
    pub per_item_ms: i64,
    /// 新项预计等待（秒）
    pub estimated_wait_seconds: f64,
    /// 新项预计总耗时（秒）
    pub estimated_total_seconds: f64,
    /// 清空队列预计耗时（秒）
    pub estimated_drain_seconds: f64,
    /// 置信度
    pub confidence: Confidence,
    /// 生成时间
    pub generated_at: DateTime<FixedOffset>,
}

/// 秒值保留一位小数
pub fn round_seconds(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
