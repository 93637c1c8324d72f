// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobStatus;
use crate::domain::models::metric::ExecutionMetric;
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

/// 执行指标仓库特质
///
/// 样本只追加不修改，公开契约上不存在更新或删除
#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// 追加样本
    async fn insert(&self, metric: &ExecutionMetric) -> Result<ExecutionMetric, RepositoryError>;
    /// 取某队列最近的样本（按记录时间倒序）
    async fn recent_for_queue(
        &self,
        queue: &str,
        since: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<ExecutionMetric>, RepositoryError>;
    /// 统计窗口内某状态的样本数
    async fn count_by_status_since(
        &self,
        queue: &str,
        status: JobStatus,
        since: DateTime<FixedOffset>,
    ) -> Result<u64, RepositoryError>;
}
