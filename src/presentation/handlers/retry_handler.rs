// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::failure::{JobFailure, NewJobFailure};
use crate::domain::models::job::JobContext;
use crate::domain::repositories::failure_repository::FailureRepository;
use crate::domain::services::retry_service::RetryService;
use crate::presentation::errors::AppError;
use crate::queue::backend::{DispatchedJob, QueueBackend};
use axum::extract::{Extension, Path};
use axum::Json;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// 手动重试请求体
#[derive(Debug, Deserialize, Default)]
pub struct RetryRequest {
    /// 重试来源标记，缺省为 manual
    pub source: Option<String>,
}

/// 对失败记录发起手动重试
///
/// POST /v1/failures/{id}/retry
///
/// 前置条件被拒绝时返回具体、可操作的错误消息
pub async fn retry_failure<F: FailureRepository + 'static, B: QueueBackend + 'static>(
    Extension(service): Extension<Arc<RetryService<F, B>>>,
    Path(failure_id): Path<Uuid>,
    body: Option<Json<RetryRequest>>,
) -> Result<Json<DispatchedJob>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let source = request.source.as_deref().unwrap_or("manual");
    let dispatched = service.enqueue_retry(failure_id, source).await?;
    Ok(Json(dispatched))
}

/// 失败上报请求体
#[derive(Debug, Deserialize)]
pub struct FailureRequest {
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 队列后端分配的ID
    pub provider_job_id: Option<String>,
    /// 任务类名
    pub job_class: String,
    /// 队列名称
    pub queue: String,
    /// 错误类名
    pub error_class: String,
    /// 错误消息
    pub error_message: String,
    /// 是否可重试，缺省为可重试
    pub retryable: Option<bool>,
    /// 原始参数包，重试时原样重新派发
    pub arguments: Option<Value>,
    /// 租户/账户ID
    pub account_id: Option<Uuid>,
    /// 子实体ID
    pub entity_id: Option<Uuid>,
    /// 关联实体类型
    pub related_type: Option<String>,
    /// 关联实体ID
    pub related_id: Option<Uuid>,
    /// 所属流水线运行ID
    pub pipeline_run_id: Option<Uuid>,
    /// 失败时间，缺省为当前时间
    pub failed_at: Option<DateTime<FixedOffset>>,
}

/// 记录一次任务失败
///
/// POST /v1/failures
pub async fn record_failure<F: FailureRepository + 'static, B: QueueBackend + 'static>(
    Extension(service): Extension<Arc<RetryService<F, B>>>,
    Json(request): Json<FailureRequest>,
) -> Result<Json<JobFailure>, AppError> {
    let mut input = NewJobFailure::new(
        request.job_id,
        &request.job_class,
        &request.queue,
        &request.error_class,
        &request.error_message,
    );
    input.provider_job_id = request.provider_job_id;
    input.retryable = request.retryable.unwrap_or(true);
    if let Some(arguments) = request.arguments {
        input.arguments = arguments;
    }
    input.context = JobContext {
        account_id: request.account_id,
        entity_id: request.entity_id,
        related_type: request.related_type,
        related_id: request.related_id,
    };
    input.pipeline_run_id = request.pipeline_run_id;
    input.failed_at = request.failed_at.unwrap_or_else(|| Utc::now().into());

    let failure = service.record_job_failure(input).await?;
    Ok(Json(failure))
}
