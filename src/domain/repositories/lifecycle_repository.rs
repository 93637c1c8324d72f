// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobLifecycle;
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

/// 生命周期记录仓库特质
///
/// 定义生命周期记录的数据访问接口。记录按任务ID唯一，
/// 并发写入的正确性由服务层的逻辑时间检查保证。
#[async_trait]
pub trait LifecycleRepository: Send + Sync {
    /// 根据任务ID查找记录
    async fn find_by_job_id(&self, job_id: Uuid) -> Result<Option<JobLifecycle>, RepositoryError>;
    /// 根据后端分配的ID查找记录
    async fn find_by_provider_id(
        &self,
        provider_job_id: &str,
    ) -> Result<Option<JobLifecycle>, RepositoryError>;
    /// 插入新记录
    async fn insert(&self, record: &JobLifecycle) -> Result<JobLifecycle, RepositoryError>;
    /// 更新记录
    async fn update(&self, record: &JobLifecycle) -> Result<JobLifecycle, RepositoryError>;
    /// 查找长时间无转移的运行中任务
    async fn stuck_running(
        &self,
        cutoff: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<JobLifecycle>, RepositoryError>;
}
