// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::failure::JobFailure;
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

/// 失败记录仓库特质
#[async_trait]
pub trait FailureRepository: Send + Sync {
    /// 插入失败记录
    async fn insert(&self, failure: &JobFailure) -> Result<JobFailure, RepositoryError>;
    /// 根据ID查找失败记录
    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobFailure>, RepositoryError>;
    /// 更新失败记录（重试簿记）
    async fn update(&self, failure: &JobFailure) -> Result<JobFailure, RepositoryError>;
    /// 自动重试候选：窗口内可重试且非认证类的失败，按时间倒序
    async fn retry_candidates(
        &self,
        since: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<JobFailure>, RepositoryError>;
}
