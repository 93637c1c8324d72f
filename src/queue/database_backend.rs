// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::queue_worker as worker_entity;
use crate::infrastructure::database::entities::queued_job as job_entity;
use crate::queue::backend::{
    DispatchRequest, DispatchedJob, InFlightState, QueueBackend, QueueError, WorkerInfo,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 工作器心跳的有效窗口
const WORKER_HEARTBEAT_WINDOW_MINUTES: i64 = 5;

/// 数据库队列后端
///
/// 以 queued_jobs / queue_workers 两张表实现队列后端契约：
/// 派发即插入待执行行，自省即查询行与工作器心跳。
/// 外部工作进程负责领取行并维护自己的心跳。
pub struct DatabaseQueueBackend {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl DatabaseQueueBackend {
    /// 创建新的数据库队列后端实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 在途状态的查询条件：待执行、重试中，或已到期的调度项
    fn backlog_condition(queue: &str) -> Condition {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Condition::all()
            .add(job_entity::Column::Queue.eq(queue))
            .add(
                Condition::any()
                    .add(job_entity::Column::State.eq("pending"))
                    .add(job_entity::Column::State.eq("retrying"))
                    .add(
                        Condition::all()
                            .add(job_entity::Column::State.eq("scheduled"))
                            .add(job_entity::Column::ScheduledAt.lte(now)),
                    ),
            )
    }
}

#[async_trait]
impl QueueBackend for DatabaseQueueBackend {
    async fn queue_depth(&self, queue: &str) -> Result<u64, QueueError> {
        let count = job_entity::Entity::find()
            .filter(Self::backlog_condition(queue))
            .count(self.db.as_ref())
            .await
            .map_err(RepositoryError::from)?;
        Ok(count)
    }

    async fn queue_latency_ms(&self, queue: &str) -> Result<Option<i64>, QueueError> {
        let oldest = job_entity::Entity::find()
            .filter(Self::backlog_condition(queue))
            .order_by_asc(job_entity::Column::EnqueuedAt)
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::from)?;
        let now: DateTime<FixedOffset> = Utc::now().into();
        Ok(oldest.map(|job| (now - job.enqueued_at).num_milliseconds().max(0)))
    }

    async fn enqueued_at(&self, job_id: Uuid) -> Result<Option<DateTime<FixedOffset>>, QueueError> {
        let job = job_entity::Entity::find_by_id(job_id)
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::from)?;
        Ok(job.map(|j| j.enqueued_at))
    }

    async fn find_in_flight(&self, job_id: Uuid) -> Result<Option<InFlightState>, QueueError> {
        let job = job_entity::Entity::find_by_id(job_id)
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::from)?;
        Ok(job.and_then(|j| match j.state.as_str() {
            "pending" => Some(InFlightState::Pending),
            "scheduled" => Some(InFlightState::Scheduled),
            "retrying" => Some(InFlightState::Retrying),
            "executing" => Some(InFlightState::Executing),
            _ => None,
        }))
    }

    async fn workers(&self) -> Result<Vec<WorkerInfo>, QueueError> {
        let heartbeat_cutoff: DateTime<FixedOffset> =
            (Utc::now() - Duration::minutes(WORKER_HEARTBEAT_WINDOW_MINUTES)).into();
        let models = worker_entity::Entity::find()
            .filter(worker_entity::Column::LastHeartbeatAt.gte(heartbeat_cutoff))
            .all(self.db.as_ref())
            .await
            .map_err(RepositoryError::from)?;

        Ok(models
            .into_iter()
            .map(|model| WorkerInfo {
                id: model.id,
                hostname: model.hostname,
                concurrency: model.concurrency.max(0) as u32,
                queues: serde_json::from_value(model.queues).unwrap_or_default(),
            })
            .collect())
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchedJob, QueueError> {
        let job_id = request.job_id.unwrap_or_else(Uuid::new_v4);
        let state = if request.scheduled_at.is_some() {
            "scheduled"
        } else {
            "pending"
        };

        let model = job_entity::ActiveModel {
            id: Set(job_id),
            provider_job_id: Set(Some(job_id.to_string())),
            queue: Set(request.queue),
            job_class: Set(request.job_class),
            arguments: Set(request.arguments),
            state: Set(state.to_string()),
            scheduled_at: Set(request.scheduled_at),
            enqueued_at: Set(Utc::now().into()),
            worker_id: Set(None),
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::from)?;

        Ok(DispatchedJob {
            job_id,
            provider_job_id: Some(job_id.to_string()),
        })
    }
}
