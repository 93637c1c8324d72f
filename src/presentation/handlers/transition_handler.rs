// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{
    JobContext, JobLifecycle, JobStatus, TransitionError, TransitionEvent, TransitionOutcome,
};
use crate::domain::models::metric::NewMetricSample;
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::repositories::metric_repository::MetricRepository;
use crate::domain::services::lifecycle_service::LifecycleService;
use crate::domain::services::metrics_service::ExecutionMetricsService;
use crate::presentation::errors::AppError;
use axum::extract::Extension;
use axum::Json;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 转移上报请求体
///
/// 共享存储之外的工作进程通过HTTP汇报状态转移
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 队列后端分配的ID
    pub provider_job_id: Option<String>,
    /// 任务类名
    pub job_class: String,
    /// 队列名称
    pub queue: String,
    /// 目标状态（原始字符串，未知状态被忽略）
    pub status: String,
    /// 转移发生时间，缺省为当前时间
    pub occurred_at: Option<DateTime<FixedOffset>>,
    /// 租户/账户ID
    pub account_id: Option<Uuid>,
    /// 子实体ID
    pub entity_id: Option<Uuid>,
    /// 关联实体类型
    pub related_type: Option<String>,
    /// 关联实体ID
    pub related_id: Option<Uuid>,
    /// 错误类名（失败/丢弃转移）
    pub error_class: Option<String>,
    /// 错误消息
    pub error_message: Option<String>,
    /// 附加元数据
    pub metadata: Option<Value>,
    /// 队列等待时长（毫秒，终态转移）
    pub queue_wait_ms: Option<i64>,
    /// 处理时长（毫秒，终态转移）
    pub processing_duration_ms: Option<i64>,
    /// 总时长（毫秒，终态转移）
    pub total_time_ms: Option<i64>,
    /// 重试次数
    pub retry_count: Option<i32>,
}

/// 转移上报响应体
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    /// 应用结果
    pub outcome: TransitionOutcome,
    /// 当前权威记录
    pub record: Option<JobLifecycle>,
}

/// 记录一次状态转移
///
/// POST /v1/transitions
///
/// 终态转移且携带时长时，同时向执行指标存储追加样本；
/// 样本追加失败不影响转移结果（遥测尽力而为）
pub async fn record_transition<R, M>(
    Extension(lifecycle): Extension<Arc<LifecycleService<R>>>,
    Extension(metrics): Extension<Arc<ExecutionMetricsService<M>>>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, AppError>
where
    R: LifecycleRepository + 'static,
    M: MetricRepository + 'static,
{
    let context = JobContext {
        account_id: request.account_id,
        entity_id: request.entity_id,
        related_type: request.related_type.clone(),
        related_id: request.related_id,
    };

    let mut event = TransitionEvent::new(
        request.job_id,
        &request.job_class,
        &request.queue,
        JobStatus::Queued,
    );
    event.status = request.status.clone();
    event.provider_job_id = request.provider_job_id.clone();
    event.occurred_at = request.occurred_at.unwrap_or_else(|| Utc::now().into());
    event.context = context.clone();
    if let (Some(class), Some(message)) = (&request.error_class, &request.error_message) {
        event.error = Some(TransitionError {
            class: class.clone(),
            message: message.clone(),
        });
    }
    if let Some(metadata) = &request.metadata {
        event.metadata = metadata.clone();
    }

    let recorded = lifecycle.record_transition(event).await?;

    if recorded.outcome == TransitionOutcome::Applied {
        if let Ok(status) = JobStatus::from_str(&request.status) {
            if status.is_terminal() {
                let mut sample = NewMetricSample::new(&request.queue, &request.job_class, status);
                sample.queue_wait_ms = request.queue_wait_ms;
                sample.processing_duration_ms = request.processing_duration_ms;
                sample.total_time_ms = request.total_time_ms;
                sample.retry_count = request.retry_count.unwrap_or(0);
                sample.context = context;
                sample.recorded_at = request.occurred_at.unwrap_or_else(|| Utc::now().into());
                if let Err(e) = metrics.append_sample(sample).await {
                    warn!(job_id = %request.job_id, "Failed to append execution sample: {}", e);
                }
            }
        }
    }

    Ok(Json(TransitionResponse {
        outcome: recorded.outcome,
        record: recorded.record,
    }))
}
