// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::failure::{FailureKind, JobFailure};
use crate::domain::models::job::JobContext;
use crate::domain::repositories::failure_repository::FailureRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::job_failure as failure_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 失败记录仓库实现
#[derive(Clone)]
pub struct FailureRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl FailureRepositoryImpl {
    /// 创建新的失败记录仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<failure_entity::Model> for JobFailure {
    fn from(model: failure_entity::Model) -> Self {
        Self {
            id: model.id,
            job_id: model.job_id,
            provider_job_id: model.provider_job_id,
            job_class: model.job_class,
            queue: model.queue,
            failure_kind: model.failure_kind.parse().unwrap_or_default(),
            error_class: model.error_class,
            error_message: model.error_message,
            retryable: model.retryable,
            arguments: model.arguments,
            context: JobContext {
                account_id: model.account_id,
                entity_id: model.entity_id,
                related_type: model.related_type,
                related_id: model.related_id,
            },
            pipeline_run_id: model.pipeline_run_id,
            failed_at: model.failed_at,
            retry_state: serde_json::from_value(model.retry_state).unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&JobFailure> for failure_entity::ActiveModel {
    fn from(failure: &JobFailure) -> Self {
        Self {
            id: Set(failure.id),
            job_id: Set(failure.job_id),
            provider_job_id: Set(failure.provider_job_id.clone()),
            job_class: Set(failure.job_class.clone()),
            queue: Set(failure.queue.clone()),
            failure_kind: Set(failure.failure_kind.to_string()),
            error_class: Set(failure.error_class.clone()),
            error_message: Set(failure.error_message.clone()),
            retryable: Set(failure.retryable),
            arguments: Set(failure.arguments.clone()),
            account_id: Set(failure.context.account_id),
            entity_id: Set(failure.context.entity_id),
            related_type: Set(failure.context.related_type.clone()),
            related_id: Set(failure.context.related_id),
            pipeline_run_id: Set(failure.pipeline_run_id),
            failed_at: Set(failure.failed_at),
            retry_state: Set(serde_json::to_value(&failure.retry_state)
                .unwrap_or(serde_json::Value::Null)),
            created_at: Set(failure.created_at),
            updated_at: Set(failure.updated_at),
        }
    }
}

#[async_trait]
impl FailureRepository for FailureRepositoryImpl {
    async fn insert(&self, failure: &JobFailure) -> Result<JobFailure, RepositoryError> {
        let model: failure_entity::ActiveModel = failure.into();
        model.insert(self.db.as_ref()).await?;
        Ok(failure.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobFailure>, RepositoryError> {
        let model = failure_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update(&self, failure: &JobFailure) -> Result<JobFailure, RepositoryError> {
        let model: failure_entity::ActiveModel = failure.into();
        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn retry_candidates(
        &self,
        since: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<JobFailure>, RepositoryError> {
        let models = failure_entity::Entity::find()
            .filter(failure_entity::Column::Retryable.eq(true))
            .filter(
                failure_entity::Column::FailureKind
                    .ne(FailureKind::Authentication.to_string()),
            )
            .filter(failure_entity::Column::FailedAt.gte(since))
            .order_by_desc(failure_entity::Column::FailedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
