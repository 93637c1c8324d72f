// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 元数据中受保护的结构性字段
///
/// 调用方提交的元数据不允许覆盖这些键
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "job_id",
    "provider_job_id",
    "job_class",
    "queue",
    "status",
    "last_transition_at",
    "queued_at",
    "started_at",
    "completed_at",
    "failed_at",
    "discarded_at",
    "removed_at",
];

/// 任务生命周期状态枚举
///
/// 表示任务在其生命周期中的不同状态。
/// 状态转换遵循以下流程：
/// Queued → Running → Completed/Failed/Discarded/Removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 已入队，任务已提交但尚未开始执行
    #[default]
    Queued,
    /// 运行中，任务正在被某个工作器执行
    Running,
    /// 已完成，任务成功执行完成
    Completed,
    /// 已失败，任务执行抛出异常
    Failed,
    /// 已丢弃，队列后端放弃了该任务（重试耗尽等）
    Discarded,
    /// 已移除，任务被从队列后端清除
    Removed,
}

impl JobStatus {
    /// 判断是否为终态
    ///
    /// 终态之后不再期望任何状态转移
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Discarded | JobStatus::Removed
        )
    }

    /// 状态序，用于同时间戳转移的决胜
    ///
    /// 相同时间戳的两个转移，仅当新状态的序严格大于当前状态时才生效。
    /// Removed 序最高：后端的清除信号覆盖其他终态。
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Discarded => 2,
            JobStatus::Removed => 3,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Discarded => write!(f, "discarded"),
            JobStatus::Removed => write!(f, "removed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "discarded" => Ok(JobStatus::Discarded),
            "removed" => Ok(JobStatus::Removed),
            _ => Err(()),
        }
    }
}

/// 任务作用域上下文
///
/// 从任务入队时的参数中提取的外键，随转移事件显式传递，
/// 而不是在每个观测点重新解析参数包。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    /// 租户/账户ID
    pub account_id: Option<Uuid>,
    /// 子实体ID
    pub entity_id: Option<Uuid>,
    /// 关联实体类型
    pub related_type: Option<String>,
    /// 关联实体ID
    pub related_id: Option<Uuid>,
}

impl JobContext {
    /// 判断上下文是否为空
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none()
            && self.entity_id.is_none()
            && self.related_type.is_none()
            && self.related_id.is_none()
    }

    /// 用另一份上下文补全缺失字段
    ///
    /// 已设置的字段保持不变，后到的转移缺少父级ID时从既有记录继承
    pub fn fill_missing_from(&mut self, other: &JobContext) {
        if self.account_id.is_none() {
            self.account_id = other.account_id;
        }
        if self.entity_id.is_none() {
            self.entity_id = other.entity_id;
        }
        if self.related_type.is_none() {
            self.related_type = other.related_type.clone();
        }
        if self.related_id.is_none() {
            self.related_id = other.related_id;
        }
    }
}

/// 转移携带的错误信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionError {
    /// 错误类名
    pub class: String,
    /// 错误消息
    pub message: String,
}

/// 状态转移事件
///
/// 由转移记录器或队列后端回调产生，是生命周期存储的唯一输入。
/// `status` 保持原始字符串以便向前兼容未知状态。
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 队列后端分配的ID（后端回调可能只有它）
    pub provider_job_id: Option<String>,
    /// 任务类名
    pub job_class: String,
    /// 队列名称
    pub queue: String,
    /// 目标状态（原始字符串）
    pub status: String,
    /// 转移发生的逻辑时间
    pub occurred_at: DateTime<FixedOffset>,
    /// 作用域上下文
    pub context: JobContext,
    /// 错误信息，仅失败/丢弃转移携带
    pub error: Option<TransitionError>,
    /// 调用方附加元数据
    pub metadata: Value,
}

impl TransitionEvent {
    /// 创建一个新的转移事件
    pub fn new(job_id: Uuid, job_class: &str, queue: &str, status: JobStatus) -> Self {
        Self {
            job_id,
            provider_job_id: None,
            job_class: job_class.to_string(),
            queue: queue.to_string(),
            status: status.to_string(),
            occurred_at: Utc::now().into(),
            context: JobContext::default(),
            error: None,
            metadata: Value::Null,
        }
    }
}

/// 转移应用结果
///
/// 过期与未知状态是预期分支，不用异常表达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// 转移已应用到记录
    Applied,
    /// 转移早于记录当前逻辑时间，被丢弃
    Stale,
    /// 状态不在已知集合内，被忽略
    Ignored,
}

/// 任务生命周期记录
///
/// 每个任务ID一条权威记录，由多个工作进程并发汇报的转移
/// 按逻辑时间序收敛到这里。里程碑时间戳首写生效。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLifecycle {
    /// 记录唯一标识符
    pub id: Uuid,
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 队列后端分配的ID
    pub provider_job_id: Option<String>,
    /// 任务类名
    pub job_class: String,
    /// 队列名称
    pub queue: String,
    /// 当前状态
    pub status: JobStatus,
    /// 最近一次被应用的转移时间（非最近收到的）
    pub last_transition_at: DateTime<FixedOffset>,
    /// 入队时间
    pub queued_at: Option<DateTime<FixedOffset>>,
    /// 开始执行时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 完成时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 失败时间
    pub failed_at: Option<DateTime<FixedOffset>>,
    /// 丢弃时间
    pub discarded_at: Option<DateTime<FixedOffset>>,
    /// 移除时间
    pub removed_at: Option<DateTime<FixedOffset>>,
    /// 错误类名
    pub error_class: Option<String>,
    /// 错误消息
    pub error_message: Option<String>,
    /// 作用域上下文
    pub context: JobContext,
    /// 自由元数据，跨转移合并
    pub metadata: Value,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

impl JobLifecycle {
    /// 从首个转移事件创建记录
    pub fn from_event(event: &TransitionEvent, status: JobStatus) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut record = Self {
            id: Uuid::new_v4(),
            job_id: event.job_id,
            provider_job_id: event.provider_job_id.clone(),
            job_class: event.job_class.clone(),
            queue: event.queue.clone(),
            status,
            last_transition_at: event.occurred_at,
            queued_at: None,
            started_at: None,
            completed_at: None,
            failed_at: None,
            discarded_at: None,
            removed_at: None,
            error_class: None,
            error_message: None,
            context: event.context.clone(),
            metadata: Value::Object(serde_json::Map::new()),
            created_at: now,
            updated_at: now,
        };
        record.apply(event, status);
        record
    }

    /// 将转移应用到记录
    ///
    /// 调用方负责先做过期检查；这里只做字段级合并：
    /// 里程碑时间戳首写生效，元数据深合并，上下文继承。
    pub fn apply(&mut self, event: &TransitionEvent, status: JobStatus) {
        self.status = status;
        self.last_transition_at = event.occurred_at;
        self.updated_at = Utc::now().into();

        if self.provider_job_id.is_none() {
            self.provider_job_id = event.provider_job_id.clone();
        }

        let milestone = match status {
            JobStatus::Queued => &mut self.queued_at,
            JobStatus::Running => &mut self.started_at,
            JobStatus::Completed => &mut self.completed_at,
            JobStatus::Failed => &mut self.failed_at,
            JobStatus::Discarded => &mut self.discarded_at,
            JobStatus::Removed => &mut self.removed_at,
        };
        if milestone.is_none() {
            *milestone = Some(event.occurred_at);
        }

        if matches!(status, JobStatus::Failed | JobStatus::Discarded) {
            if let Some(error) = &event.error {
                self.error_class = Some(error.class.clone());
                self.error_message = Some(error.message.clone());
            }
        }

        // 作用域ID一经设置即保留，后到事件只补缺口
        self.context.fill_missing_from(&event.context);

        merge_metadata(&mut self.metadata, &event.metadata);
    }
}

/// 深合并元数据
///
/// 嵌套对象做并集，保留键不被来访值覆盖
pub fn merge_metadata(target: &mut Value, incoming: &Value) {
    let Value::Object(incoming_map) = incoming else {
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let target_map = target.as_object_mut().expect("target coerced to object");

    for (key, value) in incoming_map {
        if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        match (target_map.get_mut(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(_)) => {
                merge_metadata(existing, value);
            }
            _ => {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Discarded.is_terminal());
        assert!(JobStatus::Removed.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Discarded,
            JobStatus::Removed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>(), Ok(status));
        }
        assert!("paused".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_rank_ordering() {
        assert!(JobStatus::Queued.rank() < JobStatus::Running.rank());
        assert!(JobStatus::Running.rank() < JobStatus::Failed.rank());
        assert!(JobStatus::Failed.rank() < JobStatus::Removed.rank());
        assert_eq!(JobStatus::Completed.rank(), JobStatus::Discarded.rank());
    }

    #[test]
    fn test_merge_metadata_deep_union() {
        let mut target = json!({"a": 1, "nested": {"x": 1}});
        let incoming = json!({"b": 2, "nested": {"y": 2}});
        merge_metadata(&mut target, &incoming);
        assert_eq!(target, json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_merge_metadata_protects_reserved_keys() {
        let mut target = json!({"note": "keep"});
        let incoming = json!({"status": "hacked", "queue": "other", "note": "updated"});
        merge_metadata(&mut target, &incoming);
        assert_eq!(target, json!({"note": "updated"}));
    }

    #[test]
    fn test_context_fill_missing() {
        let account = Uuid::new_v4();
        let entity = Uuid::new_v4();
        let mut sparse = JobContext {
            entity_id: Some(entity),
            ..JobContext::default()
        };
        let earlier = JobContext {
            account_id: Some(account),
            related_type: Some("post".to_string()),
            ..JobContext::default()
        };
        sparse.fill_missing_from(&earlier);
        assert_eq!(sparse.account_id, Some(account));
        assert_eq!(sparse.entity_id, Some(entity));
        assert_eq!(sparse.related_type.as_deref(), Some("post"));
    }

    #[test]
    fn test_milestones_first_write_wins() {
        let job_id = Uuid::new_v4();
        let mut first = TransitionEvent::new(job_id, "IngestJob", "default", JobStatus::Running);
        first.occurred_at = "2025-06-01T10:00:00+00:00".parse().unwrap();
        let mut record = JobLifecycle::from_event(&first, JobStatus::Running);
        let original_started = record.started_at;

        let mut second = TransitionEvent::new(job_id, "IngestJob", "default", JobStatus::Running);
        second.occurred_at = "2025-06-01T10:05:00+00:00".parse().unwrap();
        record.apply(&second, JobStatus::Running);

        assert_eq!(record.started_at, original_started);
        assert_eq!(record.last_transition_at, second.occurred_at);
    }
}
