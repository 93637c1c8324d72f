// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::issue::{Issue, IssueStatus};
use crate::domain::models::job::JobContext;
use crate::domain::repositories::issue_repository::IssueRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::issue as issue_entity;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;

/// 问题记录仓库实现
#[derive(Clone)]
pub struct IssueRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl IssueRepositoryImpl {
    /// 创建新的问题仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<issue_entity::Model> for Issue {
    fn from(model: issue_entity::Model) -> Self {
        Self {
            id: model.id,
            fingerprint: model.fingerprint,
            issue_type: model.issue_type,
            source: model.source,
            severity: model.severity.parse().unwrap_or_default(),
            status: model.status.parse().unwrap_or_default(),
            title: model.title,
            details: model.details,
            occurrences: model.occurrences,
            first_seen_at: model.first_seen_at,
            last_seen_at: model.last_seen_at,
            resolved_at: model.resolved_at,
            resolution_notes: model.resolution_notes,
            context: JobContext {
                account_id: model.account_id,
                entity_id: model.entity_id,
                related_type: None,
                related_id: None,
            },
            metadata: model.metadata,
        }
    }
}

impl From<&Issue> for issue_entity::ActiveModel {
    fn from(issue: &Issue) -> Self {
        Self {
            id: Set(issue.id),
            fingerprint: Set(issue.fingerprint.clone()),
            issue_type: Set(issue.issue_type.clone()),
            source: Set(issue.source.clone()),
            severity: Set(issue.severity.to_string()),
            status: Set(issue.status.to_string()),
            title: Set(issue.title.clone()),
            details: Set(issue.details.clone()),
            occurrences: Set(issue.occurrences),
            first_seen_at: Set(issue.first_seen_at),
            last_seen_at: Set(issue.last_seen_at),
            resolved_at: Set(issue.resolved_at),
            resolution_notes: Set(issue.resolution_notes.clone()),
            account_id: Set(issue.context.account_id),
            entity_id: Set(issue.context.entity_id),
            metadata: Set(issue.metadata.clone()),
        }
    }
}

#[async_trait]
impl IssueRepository for IssueRepositoryImpl {
    async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Issue>, RepositoryError> {
        let model = issue_entity::Entity::find()
            .filter(issue_entity::Column::Fingerprint.eq(fingerprint))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn insert(&self, issue: &Issue) -> Result<Issue, RepositoryError> {
        let model: issue_entity::ActiveModel = issue.into();
        model.insert(self.db.as_ref()).await?;
        Ok(issue.clone())
    }

    async fn update(&self, issue: &Issue) -> Result<Issue, RepositoryError> {
        let model: issue_entity::ActiveModel = issue.into();
        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn list_by_status(
        &self,
        status: Option<IssueStatus>,
        limit: u64,
    ) -> Result<Vec<Issue>, RepositoryError> {
        let mut query = issue_entity::Entity::find();
        if let Some(status) = status {
            query = query.filter(issue_entity::Column::Status.eq(status.to_string()));
        }
        let models = query
            .order_by_desc(issue_entity::Column::LastSeenAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
