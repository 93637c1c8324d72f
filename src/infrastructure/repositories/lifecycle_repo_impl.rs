// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobContext, JobLifecycle, JobStatus};
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::job_lifecycle as lifecycle_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 生命周期仓库实现
///
/// 基于SeaORM实现的生命周期记录数据访问层
#[derive(Clone)]
pub struct LifecycleRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl LifecycleRepositoryImpl {
    /// 创建新的生命周期仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<lifecycle_entity::Model> for JobLifecycle {
    fn from(model: lifecycle_entity::Model) -> Self {
        Self {
            id: model.id,
            job_id: model.job_id,
            provider_job_id: model.provider_job_id,
            job_class: model.job_class,
            queue: model.queue,
            status: model.status.parse().unwrap_or_default(),
            last_transition_at: model.last_transition_at,
            queued_at: model.queued_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            failed_at: model.failed_at,
            discarded_at: model.discarded_at,
            removed_at: model.removed_at,
            error_class: model.error_class,
            error_message: model.error_message,
            context: JobContext {
                account_id: model.account_id,
                entity_id: model.entity_id,
                related_type: model.related_type,
                related_id: model.related_id,
            },
            metadata: model.metadata,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&JobLifecycle> for lifecycle_entity::ActiveModel {
    fn from(record: &JobLifecycle) -> Self {
        Self {
            id: Set(record.id),
            job_id: Set(record.job_id),
            provider_job_id: Set(record.provider_job_id.clone()),
            job_class: Set(record.job_class.clone()),
            queue: Set(record.queue.clone()),
            status: Set(record.status.to_string()),
            last_transition_at: Set(record.last_transition_at),
            queued_at: Set(record.queued_at),
            started_at: Set(record.started_at),
            completed_at: Set(record.completed_at),
            failed_at: Set(record.failed_at),
            discarded_at: Set(record.discarded_at),
            removed_at: Set(record.removed_at),
            error_class: Set(record.error_class.clone()),
            error_message: Set(record.error_message.clone()),
            account_id: Set(record.context.account_id),
            entity_id: Set(record.context.entity_id),
            related_type: Set(record.context.related_type.clone()),
            related_id: Set(record.context.related_id),
            metadata: Set(record.metadata.clone()),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        }
    }
}

#[async_trait]
impl LifecycleRepository for LifecycleRepositoryImpl {
    async fn find_by_job_id(&self, job_id: Uuid) -> Result<Option<JobLifecycle>, RepositoryError> {
        let model = lifecycle_entity::Entity::find()
            .filter(lifecycle_entity::Column::JobId.eq(job_id))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_provider_id(
        &self,
        provider_job_id: &str,
    ) -> Result<Option<JobLifecycle>, RepositoryError> {
        let model = lifecycle_entity::Entity::find()
            .filter(lifecycle_entity::Column::ProviderJobId.eq(provider_job_id))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn insert(&self, record: &JobLifecycle) -> Result<JobLifecycle, RepositoryError> {
        let model: lifecycle_entity::ActiveModel = record.into();
        model.insert(self.db.as_ref()).await?;
        Ok(record.clone())
    }

    async fn update(&self, record: &JobLifecycle) -> Result<JobLifecycle, RepositoryError> {
        let model: lifecycle_entity::ActiveModel = record.into();
        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn stuck_running(
        &self,
        cutoff: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<JobLifecycle>, RepositoryError> {
        let models = lifecycle_entity::Entity::find()
            .filter(lifecycle_entity::Column::Status.eq(JobStatus::Running.to_string()))
            .filter(lifecycle_entity::Column::LastTransitionAt.lt(cutoff))
            .order_by_asc(lifecycle_entity::Column::LastTransitionAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
