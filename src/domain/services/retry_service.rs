// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::failure::{FailureKind, JobFailure, NewJobFailure};
use crate::domain::repositories::failure_repository::FailureRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::pipeline::{DomainStatusProbe, JobClassRegistry};
use crate::queue::backend::{DispatchRequest, DispatchedJob, QueueBackend, QueueError};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// 重试前置条件与派发错误
///
/// 手动重试把这些错误原样抛给调用方（带可读原因）；
/// 自动批处理把同样的条件转为跳过计数
#[derive(Error, Debug)]
pub enum RetryError {
    /// 认证类失败需要人工介入
    #[error("authentication failures must not be retried")]
    AuthenticationFailure,

    /// 失败记录未标记为可重试
    #[error("failure is not marked retryable")]
    NotRetryable,

    /// 任务类未注册
    #[error("unknown job class: {0}")]
    UnknownJobClass(String),

    /// 任务已在队列后端在途
    #[error("job is already queued or running ({0})")]
    AlreadyInFlight(String),

    /// 流水线已越过该任务的位置
    #[error("no longer actionable: {0}")]
    NoLongerActionable(String),

    /// 派发本身失败（已记入簿记）
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    /// 失败记录不存在
    #[error("failure record not found")]
    FailureNotFound,

    /// 仓库错误
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 队列后端错误
    #[error("queue backend error: {0}")]
    Queue(#[from] QueueError),
}

/// 自动重试批次报告
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RetryBatchReport {
    /// 扫描的候选数
    pub scanned: usize,
    /// 成功入队数
    pub enqueued: usize,
    /// 跳过数（前置条件不满足或冷却中）
    pub skipped: usize,
    /// 派发或存储错误数
    pub errors: usize,
}

/// 重试编排服务
///
/// 失败任务的幂等重派发。每个前置条件按序硬检查：
/// 认证类失败永不重试；任务类必须可解析；同一任务在后端
/// 在途集合或业务状态上可见时拒绝重复派发；流水线任务
/// 还要咨询流水线状态预言机，运行已终结时拒绝无效劳动。
///
/// 成功后以失败时存下的原始参数包重新派发，并把尝试次数、
/// 最近重试时间/任务ID/来源写回失败记录的簿记。
pub struct RetryService<F: FailureRepository, B: QueueBackend> {
    /// 失败记录仓库
    failures: Arc<F>,
    /// 队列后端
    backend: Arc<B>,
    /// 任务类注册表
    registry: Arc<JobClassRegistry>,
    /// 业务状态探针
    status_probe: Option<Arc<dyn DomainStatusProbe>>,
}

impl<F: FailureRepository, B: QueueBackend> RetryService<F, B> {
    /// 创建新的重试编排服务实例
    pub fn new(
        failures: Arc<F>,
        backend: Arc<B>,
        registry: Arc<JobClassRegistry>,
        status_probe: Option<Arc<dyn DomainStatusProbe>>,
    ) -> Self {
        Self {
            failures,
            backend,
            registry,
            status_probe,
        }
    }

    /// 记录一次任务失败
    ///
    /// 失败处理入口：保存原始参数包与作用域，供之后的重试消费
    pub async fn record_job_failure(
        &self,
        input: NewJobFailure,
    ) -> Result<JobFailure, RepositoryError> {
        let failure = input.into_failure();
        let stored = self.failures.insert(&failure).await?;
        counter!("job_failures_recorded_total").increment(1);
        Ok(stored)
    }

    /// 按失败记录ID发起重试
    pub async fn enqueue_retry(
        &self,
        failure_id: Uuid,
        source: &str,
    ) -> Result<DispatchedJob, RetryError> {
        let failure = self
            .failures
            .find_by_id(failure_id)
            .await?
            .ok_or(RetryError::FailureNotFound)?;
        self.enqueue_retry_for(&failure, source).await
    }

    /// 对一条失败记录发起重试
    ///
    /// # 参数
    ///
    /// * `failure` - 失败记录
    /// * `source` - 重试来源（manual|auto），写入簿记
    ///
    /// # 返回值
    ///
    /// * `Ok(DispatchedJob)` - 重新派发的任务
    /// * `Err(RetryError)` - 某个前置条件被拒绝或派发失败
    pub async fn enqueue_retry_for(
        &self,
        failure: &JobFailure,
        source: &str,
    ) -> Result<DispatchedJob, RetryError> {
        if failure.failure_kind == FailureKind::Authentication {
            return Err(RetryError::AuthenticationFailure);
        }
        if !failure.retryable {
            return Err(RetryError::NotRetryable);
        }
        let Some(descriptor) = self.registry.resolve(&failure.job_class) else {
            return Err(RetryError::UnknownJobClass(failure.job_class.clone()));
        };

        self.ensure_not_in_flight(failure).await?;
        self.ensure_pipeline_actionable(failure, &descriptor).await?;

        // 沿用原任务ID重派发，后续的在途查询据此识别重复
        let request = DispatchRequest {
            job_id: Some(failure.job_id),
            job_class: failure.job_class.clone(),
            queue: failure.queue.clone(),
            arguments: failure.arguments.clone(),
            scheduled_at: None,
        };

        match self.backend.dispatch(request).await {
            Ok(dispatched) => {
                self.record_retry_success(failure, &dispatched, source).await;
                info!(
                    job_class = %failure.job_class,
                    queue = %failure.queue,
                    retry_job_id = %dispatched.job_id,
                    source = %source,
                    "Retry dispatched"
                );
                counter!("retries_enqueued_total").increment(1);
                Ok(dispatched)
            }
            Err(e) => {
                // 派发失败写入簿记但不再上抛二次错误，批扫描得以继续
                self.record_retry_error(failure, &e.to_string()).await;
                Err(RetryError::DispatchFailed(e.to_string()))
            }
        }
    }

    /// 自动重试一批候选失败
    ///
    /// # 参数
    ///
    /// * `limit` - 本批最多入队数
    /// * `max_attempts` - 每条失败的自动重试次数上限
    /// * `cooldown` - 距上次重试的最短间隔
    /// * `scan_window` - 候选失败记录的回看窗口
    ///
    /// # 返回值
    ///
    /// 扫描/入队/跳过/错误计数
    pub async fn run_automatic_retry_batch(
        &self,
        limit: usize,
        max_attempts: u32,
        cooldown: Duration,
        scan_window: Duration,
    ) -> RetryBatchReport {
        let mut report = RetryBatchReport::default();
        let since: DateTime<FixedOffset> = (Utc::now() - scan_window).into();
        // 候选窗口有界：最多扫描请求数的10倍
        let scan_limit = (limit * 10).max(limit) as u64;

        let candidates = match self.failures.retry_candidates(since, scan_limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Failed to load retry candidates: {}", e);
                report.errors += 1;
                return report;
            }
        };

        let now: DateTime<FixedOffset> = Utc::now().into();
        for failure in candidates {
            if report.enqueued >= limit {
                break;
            }
            report.scanned += 1;

            if !self.cooldown_elapsed(&failure, max_attempts, cooldown, now) {
                report.skipped += 1;
                continue;
            }

            match self.enqueue_retry_for(&failure, "auto").await {
                Ok(_) => report.enqueued += 1,
                Err(
                    RetryError::DispatchFailed(_)
                    | RetryError::Repository(_)
                    | RetryError::Queue(_),
                ) => report.errors += 1,
                Err(_) => {
                    counter!("retries_skipped_total").increment(1);
                    report.skipped += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            enqueued = report.enqueued,
            skipped = report.skipped,
            errors = report.errors,
            "Automatic retry batch finished"
        );
        report
    }

    /// 冷却与次数上限判定
    fn cooldown_elapsed(
        &self,
        failure: &JobFailure,
        max_attempts: u32,
        cooldown: Duration,
        now: DateTime<FixedOffset>,
    ) -> bool {
        if failure.retry_state.attempts >= max_attempts {
            return false;
        }
        match failure.retry_state.last_retried_at {
            Some(last) => now - last >= cooldown,
            None => true,
        }
    }

    /// 在途检查
    ///
    /// 后端的待执行/调度/重试集合、工作器活动任务，
    /// 以及业务记录自身的处理状态，任一可见即拒绝
    async fn ensure_not_in_flight(&self, failure: &JobFailure) -> Result<(), RetryError> {
        if let Some(state) = self.backend.find_in_flight(failure.job_id).await? {
            return Err(RetryError::AlreadyInFlight(state.to_string()));
        }
        if let Some(probe) = &self.status_probe {
            if let Some(status) = probe.processing_status(failure).await {
                if status == "queued" || status == "running" {
                    return Err(RetryError::AlreadyInFlight(status));
                }
            }
        }
        Ok(())
    }

    /// 流水线可行性检查
    async fn ensure_pipeline_actionable(
        &self,
        failure: &JobFailure,
        descriptor: &crate::domain::services::pipeline::JobClassDescriptor,
    ) -> Result<(), RetryError> {
        let (Some(step), Some(run_id)) =
            (descriptor.pipeline_step.as_deref(), failure.pipeline_run_id)
        else {
            return Ok(());
        };
        let Some(oracle) = &descriptor.oracle else {
            return Ok(());
        };

        if oracle.pipeline_terminal(run_id).await {
            return Err(RetryError::NoLongerActionable(format!(
                "pipeline run {} is terminal",
                run_id
            )));
        }
        if oracle.step_terminal(run_id, step).await {
            return Err(RetryError::NoLongerActionable(format!(
                "step {} already terminal for run {}",
                step, run_id
            )));
        }
        Ok(())
    }

    /// 写入成功簿记
    async fn record_retry_success(
        &self,
        failure: &JobFailure,
        dispatched: &DispatchedJob,
        source: &str,
    ) {
        let mut updated = failure.clone();
        updated.retry_state.attempts += 1;
        updated.retry_state.last_retried_at = Some(Utc::now().into());
        updated.retry_state.last_retry_job_id = Some(dispatched.job_id);
        updated.retry_state.last_retry_source = Some(source.to_string());
        updated.retry_state.last_retry_error = None;
        updated.updated_at = Utc::now().into();
        if let Err(e) = self.failures.update(&updated).await {
            warn!("Failed to record retry bookkeeping: {}", e);
        }
    }

    /// 写入派发错误簿记
    async fn record_retry_error(&self, failure: &JobFailure, error: &str) {
        let mut updated = failure.clone();
        updated.retry_state.last_retry_error = Some(error.to_string());
        updated.updated_at = Utc::now().into();
        if let Err(e) = self.failures.update(&updated).await {
            warn!("Failed to record retry dispatch error: {}", e);
        }
    }
}
