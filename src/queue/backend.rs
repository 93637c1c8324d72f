// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// 队列后端错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 后端不可用
    #[error("Queue backend unavailable: {0}")]
    Unavailable(String),
}

/// 任务在后端中的在途位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightState {
    /// 等待领取
    Pending,
    /// 延迟调度中
    Scheduled,
    /// 后端自身的重试集合中
    Retrying,
    /// 正在某个工作器上执行
    Executing,
}

impl fmt::Display for InFlightState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InFlightState::Pending => write!(f, "pending"),
            InFlightState::Scheduled => write!(f, "scheduled"),
            InFlightState::Retrying => write!(f, "retrying"),
            InFlightState::Executing => write!(f, "executing"),
        }
    }
}

/// 工作器信息
///
/// 用于计算分配到某队列的有效并发
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    /// 工作器唯一标识符
    pub id: Uuid,
    /// 主机名
    pub hostname: String,
    /// 并发度
    pub concurrency: u32,
    /// 该工作器服务的队列
    pub queues: Vec<String>,
}

/// 派发请求
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// 指定任务ID，重派发沿用原ID以便在途查询去重；`None` 时后端生成
    pub job_id: Option<Uuid>,
    /// 任务类名
    pub job_class: String,
    /// 目标队列
    pub queue: String,
    /// 原始参数包
    pub arguments: Value,
    /// 延迟执行时间
    pub scheduled_at: Option<DateTime<FixedOffset>>,
}

/// 派发结果
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedJob {
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 后端分配的ID
    pub provider_job_id: Option<String>,
}

/// 队列后端特质
///
/// 对具体队列系统的最小契约：深度与时延探测、在途集合查询、
/// 工作器自省和至少一次的派发。实现方保证派发幂等性之外的语义。
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// 某队列当前深度（待执行项数）
    async fn queue_depth(&self, queue: &str) -> Result<u64, QueueError>;

    /// 某队列最老待执行项的等待时长（毫秒）
    async fn queue_latency_ms(&self, queue: &str) -> Result<Option<i64>, QueueError>;

    /// 后端记录的入队时间（本地锚点缺失时的回退来源）
    async fn enqueued_at(&self, job_id: Uuid) -> Result<Option<DateTime<FixedOffset>>, QueueError>;

    /// 查询任务是否在途（待执行/调度/重试集合或工作器活动任务）
    async fn find_in_flight(&self, job_id: Uuid) -> Result<Option<InFlightState>, QueueError>;

    /// 列出活跃工作器
    async fn workers(&self) -> Result<Vec<WorkerInfo>, QueueError>;

    /// 派发任务
    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchedJob, QueueError>;
}

#[async_trait]
impl<T: QueueBackend + ?Sized> QueueBackend for std::sync::Arc<T> {
    async fn queue_depth(&self, queue: &str) -> Result<u64, QueueError> {
        (**self).queue_depth(queue).await
    }

    async fn queue_latency_ms(&self, queue: &str) -> Result<Option<i64>, QueueError> {
        (**self).queue_latency_ms(queue).await
    }

    async fn enqueued_at(&self, job_id: Uuid) -> Result<Option<DateTime<FixedOffset>>, QueueError> {
        (**self).enqueued_at(job_id).await
    }

    async fn find_in_flight(&self, job_id: Uuid) -> Result<Option<InFlightState>, QueueError> {
        (**self).find_in_flight(job_id).await
    }

    async fn workers(&self) -> Result<Vec<WorkerInfo>, QueueError> {
        (**self).workers().await
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchedJob, QueueError> {
        (**self).dispatch(request).await
    }
}
