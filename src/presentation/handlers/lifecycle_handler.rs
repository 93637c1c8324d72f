// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobLifecycle;
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::lifecycle_service::LifecycleService;
use crate::presentation::errors::AppError;
use axum::extract::{Extension, Path};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

/// 查询任务生命周期
///
/// GET /v1/jobs/{job_id}/lifecycle
pub async fn get_lifecycle<R: LifecycleRepository + 'static>(
    Extension(service): Extension<Arc<LifecycleService<R>>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobLifecycle>, AppError> {
    let record = service
        .lifecycle_for(job_id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(record))
}
