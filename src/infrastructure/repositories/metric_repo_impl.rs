// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobContext, JobStatus};
use crate::domain::models::metric::ExecutionMetric;
use crate::domain::repositories::metric_repository::MetricRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::execution_metric as metric_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

/// 执行指标仓库实现
///
/// 样本只追加：实现层刻意不提供更新或删除
#[derive(Clone)]
pub struct MetricRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl MetricRepositoryImpl {
    /// 创建新的执行指标仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<metric_entity::Model> for ExecutionMetric {
    fn from(model: metric_entity::Model) -> Self {
        Self {
            id: model.id,
            queue: model.queue,
            job_class: model.job_class,
            status: model.status.parse().unwrap_or_default(),
            queue_wait_ms: model.queue_wait_ms,
            processing_duration_ms: model.processing_duration_ms,
            total_time_ms: model.total_time_ms,
            retry_count: model.retry_count,
            context: JobContext {
                account_id: model.account_id,
                entity_id: model.entity_id,
                related_type: None,
                related_id: None,
            },
            recorded_at: model.recorded_at,
        }
    }
}

impl From<&ExecutionMetric> for metric_entity::ActiveModel {
    fn from(metric: &ExecutionMetric) -> Self {
        Self {
            id: Set(metric.id),
            queue: Set(metric.queue.clone()),
            job_class: Set(metric.job_class.clone()),
            status: Set(metric.status.to_string()),
            queue_wait_ms: Set(metric.queue_wait_ms),
            processing_duration_ms: Set(metric.processing_duration_ms),
            total_time_ms: Set(metric.total_time_ms),
            retry_count: Set(metric.retry_count),
            account_id: Set(metric.context.account_id),
            entity_id: Set(metric.context.entity_id),
            recorded_at: Set(metric.recorded_at),
        }
    }
}

#[async_trait]
impl MetricRepository for MetricRepositoryImpl {
    async fn insert(&self, metric: &ExecutionMetric) -> Result<ExecutionMetric, RepositoryError> {
        let model: metric_entity::ActiveModel = metric.into();
        model.insert(self.db.as_ref()).await?;
        Ok(metric.clone())
    }

    async fn recent_for_queue(
        &self,
        queue: &str,
        since: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<ExecutionMetric>, RepositoryError> {
        let models = metric_entity::Entity::find()
            .filter(metric_entity::Column::Queue.eq(queue))
            .filter(metric_entity::Column::RecordedAt.gte(since))
            .order_by_desc(metric_entity::Column::RecordedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count_by_status_since(
        &self,
        queue: &str,
        status: JobStatus,
        since: DateTime<FixedOffset>,
    ) -> Result<u64, RepositoryError> {
        let count = metric_entity::Entity::find()
            .filter(metric_entity::Column::Queue.eq(queue))
            .filter(metric_entity::Column::Status.eq(status.to_string()))
            .filter(metric_entity::Column::RecordedAt.gte(since))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
