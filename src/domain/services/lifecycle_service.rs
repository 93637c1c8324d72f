// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobLifecycle, JobStatus, TransitionEvent, TransitionOutcome};
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::repositories::RepositoryError;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 转移记录结果
///
/// `Stale` 与 `Ignored` 时调用方不能假设自己的写入生效，
/// 但仍会拿到既有记录（若存在）。
#[derive(Debug)]
pub struct RecordedTransition {
    /// 应用结果
    pub outcome: TransitionOutcome,
    /// 当前权威记录
    pub record: Option<JobLifecycle>,
}

/// 生命周期服务
///
/// 每个任务ID一条权威状态机记录。多个工作进程乱序汇报的转移
/// 在这里按逻辑时间收敛：早于记录当前逻辑时间的转移被丢弃，
/// 同时间戳按状态序决胜，里程碑时间戳首写生效。
///
/// 除仓库写入外没有任何副作用：不触发告警，不触发重试。
pub struct LifecycleService<R: LifecycleRepository> {
    /// 生命周期仓库
    repository: Arc<R>,
}

impl<R: LifecycleRepository> LifecycleService<R> {
    /// 创建新的生命周期服务实例
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 记录一次状态转移
    ///
    /// # 参数
    ///
    /// * `event` - 转移事件，`status` 为原始字符串
    ///
    /// # 返回值
    ///
    /// * `Ok(RecordedTransition)` - 应用结果与当前权威记录
    /// * `Err(RepositoryError)` - 仓库读写失败
    pub async fn record_transition(
        &self,
        event: TransitionEvent,
    ) -> Result<RecordedTransition, RepositoryError> {
        let Ok(status) = event.status.parse::<JobStatus>() else {
            // 未知状态不是错误：保持对未来状态的向前兼容
            debug!(
                job_id = %event.job_id,
                status = %event.status,
                "Ignoring transition with unknown status"
            );
            counter!("job_transitions_ignored_total").increment(1);
            let record = self.resolve_record(&event).await?;
            return Ok(RecordedTransition {
                outcome: TransitionOutcome::Ignored,
                record,
            });
        };

        let existing = self.resolve_record(&event).await?;

        let Some(mut record) = existing else {
            let record = JobLifecycle::from_event(&event, status);
            let created = self.repository.insert(&record).await?;
            debug!(
                job_id = %event.job_id,
                status = %status,
                queue = %event.queue,
                "Created lifecycle record"
            );
            counter!("job_transitions_applied_total").increment(1);
            return Ok(RecordedTransition {
                outcome: TransitionOutcome::Applied,
                record: Some(created),
            });
        };

        if self.is_stale(&record, &event, status) {
            debug!(
                job_id = %event.job_id,
                incoming_status = %status,
                incoming_at = %event.occurred_at,
                current_status = %record.status,
                current_at = %record.last_transition_at,
                "Discarding stale transition"
            );
            counter!("job_transitions_stale_total").increment(1);
            return Ok(RecordedTransition {
                outcome: TransitionOutcome::Stale,
                record: Some(record),
            });
        }

        record.apply(&event, status);
        let updated = self.repository.update(&record).await?;
        counter!("job_transitions_applied_total").increment(1);
        Ok(RecordedTransition {
            outcome: TransitionOutcome::Applied,
            record: Some(updated),
        })
    }

    /// 根据任务ID查询生命周期记录
    pub async fn lifecycle_for(
        &self,
        job_id: Uuid,
    ) -> Result<Option<JobLifecycle>, RepositoryError> {
        self.repository.find_by_job_id(job_id).await
    }

    /// 解析事件对应的既有记录
    ///
    /// 优先按任务ID，缺失时退回后端分配的ID——后端汇报的移除事件
    /// 可能从未有过配对的入队事件
    async fn resolve_record(
        &self,
        event: &TransitionEvent,
    ) -> Result<Option<JobLifecycle>, RepositoryError> {
        if let Some(record) = self.repository.find_by_job_id(event.job_id).await? {
            return Ok(Some(record));
        }
        if let Some(provider_id) = &event.provider_job_id {
            return self.repository.find_by_provider_id(provider_id).await;
        }
        Ok(None)
    }

    /// 过期判定
    ///
    /// 严格更早的转移直接丢弃；同时间戳时仅当新状态的序
    /// 严格大于当前状态才生效，等序保持已存记录，保证决胜确定性
    fn is_stale(&self, record: &JobLifecycle, event: &TransitionEvent, status: JobStatus) -> bool {
        if event.occurred_at < record.last_transition_at {
            return true;
        }
        if event.occurred_at == record.last_transition_at {
            return status.rank() <= record.status.rank();
        }
        false
    }
}

/// 转移记录失败时只记日志不上抛的便捷包装
///
/// 遥测路径绝不让被观测的任务失败
pub async fn record_transition_best_effort<R: LifecycleRepository>(
    service: &LifecycleService<R>,
    event: TransitionEvent,
) -> Option<RecordedTransition> {
    match service.record_transition(event).await {
        Ok(recorded) => Some(recorded),
        Err(e) => {
            warn!("Failed to record job transition: {}", e);
            None
        }
    }
}
