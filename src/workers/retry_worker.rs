// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RetrySettings;
use crate::domain::repositories::failure_repository::FailureRepository;
use crate::domain::services::retry_service::RetryService;
use crate::queue::backend::QueueBackend;
use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::info;

/// 自动重试工作器
///
/// 按配置的间隔运行一批自动重试。间隔加入 ±10% 抖动，
/// 多实例部署时批扫描不会同时命中存储。
pub struct RetryWorker<F, B>
where
    F: FailureRepository + 'static,
    B: QueueBackend + 'static,
{
    retry_service: Arc<RetryService<F, B>>,
    settings: RetrySettings,
}

impl<F, B> RetryWorker<F, B>
where
    F: FailureRepository + 'static,
    B: QueueBackend + 'static,
{
    /// 创建新的自动重试工作器实例
    pub fn new(retry_service: Arc<RetryService<F, B>>, settings: RetrySettings) -> Self {
        Self {
            retry_service,
            settings,
        }
    }

    /// 启动后台循环
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let base_secs = self.settings.interval_seconds.max(1) as f64;
            loop {
                let jitter = rand::random_range(0.9..1.1);
                sleep(TokioDuration::from_secs_f64(base_secs * jitter)).await;

                let report = self
                    .retry_service
                    .run_automatic_retry_batch(
                        self.settings.batch_limit,
                        self.settings.max_attempts,
                        Duration::minutes(self.settings.cooldown_minutes),
                        Duration::hours(self.settings.scan_window_hours),
                    )
                    .await;

                if report.enqueued > 0 || report.errors > 0 {
                    info!(
                        enqueued = report.enqueued,
                        skipped = report.skipped,
                        errors = report.errors,
                        "Retry worker tick"
                    );
                }
            }
        })
    }
}
