// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::issue::{Issue, IssueStatus};
use crate::domain::repositories::issue_repository::IssueRepository;
use crate::domain::services::issue_service::IssueService;
use crate::presentation::errors::AppError;
use axum::extract::{Extension, Query};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// 问题列表查询参数
#[derive(Debug, Deserialize)]
pub struct IssueListQuery {
    /// 状态过滤（open|pending|resolved），缺省为全部
    pub status: Option<String>,
    /// 返回条数上限
    pub limit: Option<u64>,
}

/// 列出运维问题
///
/// GET /v1/issues
pub async fn list_issues<I: IssueRepository + 'static>(
    Extension(service): Extension<Arc<IssueService<I>>>,
    Query(query): Query<IssueListQuery>,
) -> Result<Json<Vec<Issue>>, AppError> {
    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<IssueStatus>()
                .map_err(|_| anyhow::anyhow!("invalid issue status: {}", raw))?,
        ),
        None => None,
    };
    let issues = service.list_issues(status, query.limit.unwrap_or(100)).await?;
    Ok(Json(issues))
}
