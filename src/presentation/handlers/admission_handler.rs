// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::admission_service::{AdmissionDecision, AdmissionService};
use crate::infrastructure::system::resources::ResourceProbe;
use crate::presentation::errors::AppError;
use crate::queue::backend::QueueBackend;
use axum::extract::Extension;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// 准入判定请求体
#[derive(Debug, Deserialize)]
pub struct AdmissionCheckRequest {
    /// 任务名
    pub task: String,
    /// 目标队列
    pub queue: String,
    /// 是否关键任务
    #[serde(default)]
    pub critical: bool,
}

/// 任务准入判定
///
/// POST /v1/admission/check
pub async fn check_admission<P: ResourceProbe + 'static, B: QueueBackend + 'static>(
    Extension(service): Extension<Arc<AdmissionService<P, B>>>,
    Json(request): Json<AdmissionCheckRequest>,
) -> Result<Json<AdmissionDecision>, AppError> {
    let decision = service
        .allow_task(&request.task, &request.queue, request.critical)
        .await;
    Ok(Json(decision))
}
