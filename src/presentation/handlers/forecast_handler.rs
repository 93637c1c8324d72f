// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::models::forecast::QueueEstimate;
use crate::domain::repositories::metric_repository::MetricRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::forecast_service::ForecastService;
use crate::presentation::errors::AppError;
use crate::queue::backend::QueueBackend;
use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// 快照查询参数
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// 逗号分隔的队列名，缺省为配置的监控队列
    pub queues: Option<String>,
    /// 跳过缓存强制重算
    pub force: Option<bool>,
}

/// 查询一组队列的预测快照
///
/// GET /v1/queues/estimates
pub async fn snapshot<M: MetricRepository + 'static, B: QueueBackend + 'static>(
    Extension(service): Extension<Arc<ForecastService<M, B>>>,
    Extension(settings): Extension<Arc<Settings>>,
    Query(query): Query<SnapshotQuery>,
) -> Json<Vec<QueueEstimate>> {
    let queues: Vec<String> = match &query.queues {
        Some(raw) => raw
            .split(',')
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect(),
        None => settings.queues.monitored.clone(),
    };
    let estimates = service.snapshot(&queues, query.force.unwrap_or(false)).await;
    Json(estimates)
}

/// 查询单个队列的预测
///
/// GET /v1/queues/{name}/estimate
pub async fn queue_estimate<M: MetricRepository + 'static, B: QueueBackend + 'static>(
    Extension(service): Extension<Arc<ForecastService<M, B>>>,
    Path(name): Path<String>,
) -> Result<Json<QueueEstimate>, AppError> {
    let estimate = service
        .estimate(&name)
        .await
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(estimate))
}
