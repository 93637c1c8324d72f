// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::Extension;
use jobpulse::config::settings::Settings;
use jobpulse::domain::services::admission_service::AdmissionService;
use jobpulse::domain::services::forecast_service::ForecastService;
use jobpulse::domain::services::issue_service::IssueService;
use jobpulse::domain::services::lifecycle_service::LifecycleService;
use jobpulse::domain::services::metrics_service::ExecutionMetricsService;
use jobpulse::domain::services::pipeline::JobClassRegistry;
use jobpulse::domain::services::retry_service::RetryService;
use jobpulse::infrastructure::cache::ttl_cache::{SystemClock, TtlCache};
use jobpulse::infrastructure::database::connection;
use jobpulse::infrastructure::repositories::failure_repo_impl::FailureRepositoryImpl;
use jobpulse::infrastructure::repositories::issue_repo_impl::IssueRepositoryImpl;
use jobpulse::infrastructure::repositories::lifecycle_repo_impl::LifecycleRepositoryImpl;
use jobpulse::infrastructure::repositories::metric_repo_impl::MetricRepositoryImpl;
use jobpulse::infrastructure::system::resources::SysinfoResourceProbe;
use jobpulse::presentation::routes;
use jobpulse::queue::database_backend::DatabaseQueueBackend;
use jobpulse::utils::telemetry;
use jobpulse::workers::health_worker::HealthWorker;
use jobpulse::workers::manager::WorkerManager;
use jobpulse::workers::retry_worker::RetryWorker;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting jobpulse...");

    // Initialize Prometheus Metrics
    jobpulse::infrastructure::observability::metrics::init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize repositories and queue backend
    let lifecycle_repo = Arc::new(LifecycleRepositoryImpl::new(db.clone()));
    let metric_repo = Arc::new(MetricRepositoryImpl::new(db.clone()));
    let issue_repo = Arc::new(IssueRepositoryImpl::new(db.clone()));
    let failure_repo = Arc::new(FailureRepositoryImpl::new(db.clone()));
    let backend = Arc::new(DatabaseQueueBackend::new(db.clone()));

    // 5. Initialize services
    let lifecycle_service = Arc::new(LifecycleService::new(lifecycle_repo.clone()));
    let metrics_service = Arc::new(ExecutionMetricsService::new(metric_repo.clone()));
    let forecast_cache = Arc::new(TtlCache::new(
        chrono::Duration::seconds(settings.forecast.cache_ttl_seconds as i64),
        Arc::new(SystemClock),
    ));
    let forecast_service = Arc::new(ForecastService::new(
        metric_repo.clone(),
        backend.clone(),
        forecast_cache,
        settings.forecast.clone(),
    ));
    let admission_service = Arc::new(AdmissionService::new(
        Arc::new(SysinfoResourceProbe),
        backend.clone(),
        settings.admission,
    ));
    let issue_service = Arc::new(IssueService::new(issue_repo.clone()));
    let registry = Arc::new(JobClassRegistry::new());
    let retry_service = Arc::new(RetryService::new(
        failure_repo.clone(),
        backend.clone(),
        registry.clone(),
        None,
    ));
    info!("Services initialized");

    // 6. Start background workers
    let mut worker_manager = WorkerManager::new();
    worker_manager.register(
        RetryWorker::new(retry_service.clone(), settings.retry).start(),
    );
    worker_manager.register(
        HealthWorker::new(
            lifecycle_repo.clone(),
            issue_service.clone(),
            settings.queues.monitored.clone(),
            settings.health,
        )
        .start(),
    );
    info!("Background workers started");

    // 7. Start HTTP server
    let app = routes::routes().layer(
        ServiceBuilder::new()
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .layer(Extension(lifecycle_service))
            .layer(Extension(metrics_service))
            .layer(Extension(forecast_service))
            .layer(Extension(admission_service))
            .layer(Extension(issue_service))
            .layer(Extension(retry_service))
            .layer(Extension(settings.clone())),
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = worker_manager.wait_for_shutdown() => {}
    }

    Ok(())
}
