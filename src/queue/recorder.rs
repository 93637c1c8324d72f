// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobContext, JobStatus, TransitionError, TransitionEvent};
use crate::domain::models::metric::{clamp_duration_ms, NewMetricSample};
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::repositories::metric_repository::MetricRepository;
use crate::domain::services::lifecycle_service::{
    record_transition_best_effort, LifecycleService,
};
use crate::domain::services::metrics_service::ExecutionMetricsService;
use crate::queue::backend::QueueBackend;
use crate::utils::fallback::first_present;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 任务信封
///
/// 随任务自身的瞬态负载传递的工作状态：三个时间锚点
/// 在入队侧与执行侧的交接中存活，无需独立存储。
#[derive(Debug, Clone)]
pub struct JobEnvelope {
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 队列后端分配的ID
    pub provider_job_id: Option<String>,
    /// 任务类名
    pub job_class: String,
    /// 队列名称
    pub queue: String,
    /// 原始参数包
    pub arguments: serde_json::Value,
    /// 作用域上下文，入队时填充
    pub context: JobContext,
    /// 执行时的重试次数
    pub retry_count: i32,
    /// 入队时间锚点（首见生效）
    pub enqueued_at: Option<DateTime<FixedOffset>>,
    /// 被工作器领取的时间锚点
    pub reserved_at: Option<DateTime<FixedOffset>>,
    /// 开始执行的时间锚点
    pub started_at: Option<DateTime<FixedOffset>>,
}

impl JobEnvelope {
    /// 创建一个新的任务信封
    pub fn new(job_id: Uuid, job_class: &str, queue: &str) -> Self {
        Self {
            job_id,
            provider_job_id: None,
            job_class: job_class.to_string(),
            queue: queue.to_string(),
            arguments: serde_json::Value::Object(serde_json::Map::new()),
            context: JobContext::default(),
            retry_count: 0,
            enqueued_at: None,
            reserved_at: None,
            started_at: None,
        }
    }
}

/// 状态转移记录器
///
/// 包裹任务相对队列后端的三个状态变化点（入队、领取、开始执行）
/// 和两个终态出口（成功、异常）。每个事件计算耗时指标并产生
/// 转移事件；终态事件另外向执行指标存储追加样本。
///
/// 这里的一切失败只记日志：遥测路径绝不让被观测的任务失败。
pub struct TransitionRecorder<R, M, B>
where
    R: LifecycleRepository,
    M: MetricRepository,
    B: QueueBackend,
{
    lifecycle: Arc<LifecycleService<R>>,
    metrics: Arc<ExecutionMetricsService<M>>,
    backend: Arc<B>,
}

impl<R, M, B> TransitionRecorder<R, M, B>
where
    R: LifecycleRepository,
    M: MetricRepository,
    B: QueueBackend,
{
    /// 创建新的状态转移记录器实例
    pub fn new(
        lifecycle: Arc<LifecycleService<R>>,
        metrics: Arc<ExecutionMetricsService<M>>,
        backend: Arc<B>,
    ) -> Self {
        Self {
            lifecycle,
            metrics,
            backend,
        }
    }

    /// 记录入队
    ///
    /// 首见时在信封上盖入队锚点，并发出 queued 转移
    pub async fn record_enqueued(&self, envelope: &mut JobEnvelope) {
        let now: DateTime<FixedOffset> = Utc::now().into();
        if envelope.enqueued_at.is_none() {
            envelope.enqueued_at = Some(now);
        }

        let mut event = self.base_event(envelope, JobStatus::Queued);
        event.occurred_at = envelope.enqueued_at.unwrap_or(now);
        self.emit(event).await;
    }

    /// 记录被工作器领取
    ///
    /// 计算队列等待并盖领取锚点；领取不是状态集合中的状态，
    /// 只做结构化日志，不写生命周期存储
    pub async fn record_reserved(&self, envelope: &mut JobEnvelope) {
        let now: DateTime<FixedOffset> = Utc::now().into();
        if envelope.reserved_at.is_none() {
            envelope.reserved_at = Some(now);
        }

        let queue_wait_ms = self.queue_wait_ms(envelope).await;
        debug!(
            job_id = %envelope.job_id,
            job_class = %envelope.job_class,
            queue = %envelope.queue,
            queue_wait_ms = ?queue_wait_ms,
            "Job reserved by worker"
        );
    }

    /// 记录开始执行
    pub async fn record_started(&self, envelope: &mut JobEnvelope) {
        let now: DateTime<FixedOffset> = Utc::now().into();
        if envelope.started_at.is_none() {
            envelope.started_at = Some(now);
        }

        let mut event = self.base_event(envelope, JobStatus::Running);
        event.occurred_at = envelope.started_at.unwrap_or(now);
        if let Some(queue_wait_ms) = self.queue_wait_ms(envelope).await {
            event.metadata = json!({ "queue_wait_ms": queue_wait_ms });
        }
        self.emit(event).await;
    }

    /// 记录成功完成
    pub async fn record_completed(&self, envelope: &JobEnvelope) {
        self.record_terminal(envelope, JobStatus::Completed, None).await;
    }

    /// 记录执行异常
    pub async fn record_failed(&self, envelope: &JobEnvelope, error_class: &str, message: &str) {
        let error = TransitionError {
            class: error_class.to_string(),
            message: message.to_string(),
        };
        self.record_terminal(envelope, JobStatus::Failed, Some(error)).await;
    }

    /// 终态公共路径：转移 + 指标样本
    async fn record_terminal(
        &self,
        envelope: &JobEnvelope,
        status: JobStatus,
        error: Option<TransitionError>,
    ) {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let enqueue_anchor = self.enqueue_anchor(envelope).await;

        let queue_wait_ms = span_ms(enqueue_anchor, envelope.reserved_at.unwrap_or(now));
        let processing_duration_ms = span_ms(envelope.started_at, now);
        let total_time_ms = span_ms(enqueue_anchor, now);

        let mut event = self.base_event(envelope, status);
        event.occurred_at = now;
        event.error = error;
        event.metadata = json!({
            "queue_wait_ms": queue_wait_ms,
            "processing_duration_ms": processing_duration_ms,
            "total_time_ms": total_time_ms,
        });
        self.emit(event).await;

        let mut sample = NewMetricSample::new(&envelope.queue, &envelope.job_class, status);
        sample.queue_wait_ms = queue_wait_ms;
        sample.processing_duration_ms = processing_duration_ms;
        sample.total_time_ms = total_time_ms;
        sample.retry_count = envelope.retry_count;
        sample.context = envelope.context.clone();
        sample.recorded_at = now;
        if let Err(e) = self.metrics.append_sample(sample).await {
            warn!(
                job_id = %envelope.job_id,
                "Failed to append execution sample: {}",
                e
            );
        }
    }

    /// 入队锚点：本地首见时间优先，缺失时回退后端记录
    async fn enqueue_anchor(&self, envelope: &JobEnvelope) -> Option<DateTime<FixedOffset>> {
        let backend_ts = if envelope.enqueued_at.is_none() {
            match self.backend.enqueued_at(envelope.job_id).await {
                Ok(ts) => ts,
                Err(e) => {
                    debug!(job_id = %envelope.job_id, "Backend enqueue timestamp unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };
        first_present([envelope.enqueued_at, backend_ts])
    }

    /// 队列等待 = 领取时间 − 入队时间
    async fn queue_wait_ms(&self, envelope: &JobEnvelope) -> Option<i64> {
        let reserved = envelope.reserved_at?;
        let anchor = self.enqueue_anchor(envelope).await?;
        clamp_duration_ms((reserved - anchor).num_milliseconds())
    }

    fn base_event(&self, envelope: &JobEnvelope, status: JobStatus) -> TransitionEvent {
        let mut event =
            TransitionEvent::new(envelope.job_id, &envelope.job_class, &envelope.queue, status);
        event.provider_job_id = envelope.provider_job_id.clone();
        event.context = envelope.context.clone();
        event
    }

    /// 发出转移，失败只记日志
    async fn emit(&self, event: TransitionEvent) {
        debug!(
            job_id = %event.job_id,
            job_class = %event.job_class,
            queue = %event.queue,
            status = %event.status,
            occurred_at = %event.occurred_at,
            "Job transition"
        );
        record_transition_best_effort(self.lifecycle.as_ref(), event).await;
    }
}

/// 两个时间点之间的毫秒跨度，钳制到 [0, 7天]
///
/// 锚点缺失时返回 `None`，不伪造零值
fn span_ms(from: Option<DateTime<FixedOffset>>, to: DateTime<FixedOffset>) -> Option<i64> {
    from.and_then(|start| clamp_duration_ms((to - start).num_milliseconds()))
}
