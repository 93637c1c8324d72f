// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::HealthSettings;
use crate::domain::models::issue::{compute_fingerprint, IssueReport, IssueSeverity};
use crate::domain::models::job::JobContext;
use crate::domain::repositories::issue_repository::IssueRepository;
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::services::issue_service::IssueService;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{error, info};

/// 一次巡检最多检查的记录数
const STUCK_SCAN_LIMIT: u64 = 500;

/// 健康巡检工作器
///
/// 周期性检查长时间无状态转移的运行中任务，按队列聚合成
/// 运维问题；某队列恢复健康时，同一指纹的问题被解除。
pub struct HealthWorker<R, I>
where
    R: LifecycleRepository + 'static,
    I: IssueRepository + 'static,
{
    lifecycle_repository: Arc<R>,
    issues: Arc<IssueService<I>>,
    monitored_queues: Vec<String>,
    settings: HealthSettings,
}

impl<R, I> HealthWorker<R, I>
where
    R: LifecycleRepository + 'static,
    I: IssueRepository + 'static,
{
    /// 创建新的健康巡检工作器实例
    pub fn new(
        lifecycle_repository: Arc<R>,
        issues: Arc<IssueService<I>>,
        monitored_queues: Vec<String>,
        settings: HealthSettings,
    ) -> Self {
        Self {
            lifecycle_repository,
            issues,
            monitored_queues,
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
            let mut ticker =
                interval(TokioDuration::from_secs(self.settings.interval_seconds.max(1)));
            loop {
                ticker.tick().await;
                self.run_checks().await;
            }
        })
    }

    /// 执行一轮巡检
    async fn run_checks(&self) {
        let cutoff: DateTime<FixedOffset> =
            (Utc::now() - Duration::minutes(self.settings.stuck_after_minutes)).into();

        let stuck = match self
            .lifecycle_repository
            .stuck_running(cutoff, STUCK_SCAN_LIMIT)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                error!("Health check failed to scan stuck jobs: {}", e);
                return;
            }
        };

        let mut per_queue: HashMap<&str, u64> = HashMap::new();
        for record in &stuck {
            *per_queue.entry(record.queue.as_str()).or_insert(0) += 1;
        }

        for queue in &self.monitored_queues {
            let count = per_queue.get(queue.as_str()).copied().unwrap_or(0);
            let fingerprint =
                compute_fingerprint("stuck_jobs", queue, &JobContext::default(), None);

            if count > 0 {
                let severity = if count >= 10 {
                    IssueSeverity::Error
                } else {
                    IssueSeverity::Warning
                };
                let mut report = IssueReport::new(
                    "stuck_jobs",
                    queue,
                    severity,
                    &format!("{} running jobs without progress in queue {}", count, queue),
                );
                report.fingerprint = Some(fingerprint);
                report.details = Some(format!(
                    "Jobs running with no transition for over {} minutes",
                    self.settings.stuck_after_minutes
                ));
                report.metadata = json!({ "stuck_count": count });
                if let Err(e) = self.issues.upsert_issue(report).await {
                    error!(queue = %queue, "Failed to upsert stuck-jobs issue: {}", e);
                } else {
                    info!(queue = %queue, count = count, "Stuck jobs detected");
                }
            } else if let Err(e) = self
                .issues
                .resolve_by_fingerprint(&fingerprint, Some("queue healthy on periodic check"))
                .await
            {
                error!(queue = %queue, "Failed to resolve stuck-jobs issue: {}", e);
            }
        }
    }
}
