// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::issue::{Issue, IssueStatus};
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;

/// 问题记录仓库特质
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// 根据指纹查找问题
    async fn find_by_fingerprint(&self, fingerprint: &str)
        -> Result<Option<Issue>, RepositoryError>;
    /// 插入新问题
    async fn insert(&self, issue: &Issue) -> Result<Issue, RepositoryError>;
    /// 更新问题
    async fn update(&self, issue: &Issue) -> Result<Issue, RepositoryError>;
    /// 按状态列出问题（`None` 为全部）
    async fn list_by_status(
        &self,
        status: Option<IssueStatus>,
        limit: u64,
    ) -> Result<Vec<Issue>, RepositoryError>;
}
