// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::repositories::failure_repo_impl::FailureRepositoryImpl;
use crate::infrastructure::repositories::issue_repo_impl::IssueRepositoryImpl;
use crate::infrastructure::repositories::lifecycle_repo_impl::LifecycleRepositoryImpl;
use crate::infrastructure::repositories::metric_repo_impl::MetricRepositoryImpl;
use crate::infrastructure::system::resources::SysinfoResourceProbe;
use crate::presentation::handlers::{
    admission_handler, forecast_handler, issue_handler, lifecycle_handler, retry_handler,
    transition_handler,
};
use crate::queue::database_backend::DatabaseQueueBackend;
use axum::{
    routing::{get, post},
    Router,
};

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route(
            "/v1/queues/estimates",
            get(forecast_handler::snapshot::<MetricRepositoryImpl, DatabaseQueueBackend>),
        )
        .route(
            "/v1/queues/{name}/estimate",
            get(forecast_handler::queue_estimate::<MetricRepositoryImpl, DatabaseQueueBackend>),
        )
        .route(
            "/v1/jobs/{job_id}/lifecycle",
            get(lifecycle_handler::get_lifecycle::<LifecycleRepositoryImpl>),
        )
        .route(
            "/v1/issues",
            get(issue_handler::list_issues::<IssueRepositoryImpl>),
        )
        .route(
            "/v1/transitions",
            post(
                transition_handler::record_transition::<
                    LifecycleRepositoryImpl,
                    MetricRepositoryImpl,
                >,
            ),
        )
        .route(
            "/v1/failures",
            post(retry_handler::record_failure::<FailureRepositoryImpl, DatabaseQueueBackend>),
        )
        .route(
            "/v1/failures/{id}/retry",
            post(retry_handler::retry_failure::<FailureRepositoryImpl, DatabaseQueueBackend>),
        )
        .route(
            "/v1/admission/check",
            post(
                admission_handler::check_admission::<SysinfoResourceProbe, DatabaseQueueBackend>,
            ),
        );

    Router::new().merge(public_routes).merge(api_routes)
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
