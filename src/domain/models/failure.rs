// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobContext;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 失败类别枚举
///
/// 认证类失败需要人工介入，绝不自动重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 认证失败（凭据过期、被吊销）
    Authentication,
    /// 超时
    Timeout,
    /// 资源不足（内存、磁盘、配额）
    Resource,
    /// 一般运行时错误
    #[default]
    Runtime,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::Authentication => write!(f, "authentication"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Resource => write!(f, "resource"),
            FailureKind::Runtime => write!(f, "runtime"),
        }
    }
}

impl FromStr for FailureKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authentication" => Ok(FailureKind::Authentication),
            "timeout" => Ok(FailureKind::Timeout),
            "resource" => Ok(FailureKind::Resource),
            "runtime" => Ok(FailureKind::Runtime),
            _ => Err(()),
        }
    }
}

/// 根据错误类名和消息推断失败类别
pub fn classify_failure(error_class: &str, error_message: &str) -> FailureKind {
    let haystack = format!("{} {}", error_class, error_message).to_lowercase();

    let authentication_patterns = [
        "unauthorized",
        "authentication",
        "invalid credentials",
        "token expired",
        "forbidden",
        "401",
    ];
    if authentication_patterns.iter().any(|p| haystack.contains(p)) {
        return FailureKind::Authentication;
    }

    let timeout_patterns = ["timeout", "timed out", "deadline exceeded"];
    if timeout_patterns.iter().any(|p| haystack.contains(p)) {
        return FailureKind::Timeout;
    }

    let resource_patterns = ["out of memory", "no space left", "quota", "too many connections"];
    if resource_patterns.iter().any(|p| haystack.contains(p)) {
        return FailureKind::Resource;
    }

    FailureKind::Runtime
}

/// 重试簿记
///
/// 存放在失败记录的重试状态列中，跨重试累积
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBookkeeping {
    /// 已尝试的重试次数
    #[serde(default)]
    pub attempts: u32,
    /// 最近一次重试时间
    #[serde(default)]
    pub last_retried_at: Option<DateTime<FixedOffset>>,
    /// 最近一次重试派发的任务ID
    #[serde(default)]
    pub last_retry_job_id: Option<Uuid>,
    /// 最近一次重试的来源（manual|auto）
    #[serde(default)]
    pub last_retry_source: Option<String>,
    /// 最近一次重试派发失败的错误
    #[serde(default)]
    pub last_retry_error: Option<String>,
}

/// 任务失败记录
///
/// 失败处理入口写入，重试编排器消费。
/// 原始参数包随记录保存，重试时原样重新派发。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
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
    /// 失败类别
    pub failure_kind: FailureKind,
    /// 错误类名
    pub error_class: String,
    /// 错误消息
    pub error_message: String,
    /// 是否可重试
    pub retryable: bool,
    /// 原始参数包
    pub arguments: Value,
    /// 作用域上下文
    pub context: JobContext,
    /// 所属流水线运行ID
    pub pipeline_run_id: Option<Uuid>,
    /// 失败时间
    pub failed_at: DateTime<FixedOffset>,
    /// 重试簿记
    pub retry_state: RetryBookkeeping,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 新失败记录输入
#[derive(Debug, Clone)]
pub struct NewJobFailure {
    /// 任务唯一标识符
    pub job_id: Uuid,
    /// 队列后端分配的ID
    pub provider_job_id: Option<String>,
    /// 任务类名
    pub job_class: String,
    /// 队列名称
    pub queue: String,
    /// 错误类名
    pub error_class: String,
    /// 错误消息
    pub error_message: String,
    /// 是否可重试
    pub retryable: bool,
    /// 原始参数包
    pub arguments: Value,
    /// 作用域上下文
    pub context: JobContext,
    /// 所属流水线运行ID
    pub pipeline_run_id: Option<Uuid>,
    /// 失败时间
    pub failed_at: DateTime<FixedOffset>,
}

impl NewJobFailure {
    /// 创建一个新失败记录输入
    pub fn new(job_id: Uuid, job_class: &str, queue: &str, error_class: &str, message: &str) -> Self {
        Self {
            job_id,
            provider_job_id: None,
            job_class: job_class.to_string(),
            queue: queue.to_string(),
            error_class: error_class.to_string(),
            error_message: message.to_string(),
            retryable: true,
            arguments: Value::Object(serde_json::Map::new()),
            context: JobContext::default(),
            pipeline_run_id: None,
            failed_at: Utc::now().into(),
        }
    }

    /// 物化为失败记录
    pub fn into_failure(self) -> JobFailure {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let failure_kind = classify_failure(&self.error_class, &self.error_message);
        JobFailure {
            id: Uuid::new_v4(),
            job_id: self.job_id,
            provider_job_id: self.provider_job_id,
            job_class: self.job_class,
            queue: self.queue,
            failure_kind,
            error_class: self.error_class,
            error_message: self.error_message,
            retryable: self.retryable,
            arguments: self.arguments,
            context: self.context,
            pipeline_run_id: self.pipeline_run_id,
            failed_at: self.failed_at,
            retry_state: RetryBookkeeping::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authentication() {
        assert_eq!(
            classify_failure("AuthError", "invalid credentials for tenant"),
            FailureKind::Authentication
        );
        assert_eq!(
            classify_failure("HttpError", "server returned 401"),
            FailureKind::Authentication
        );
    }

    #[test]
    fn test_classify_timeout_and_resource() {
        assert_eq!(
            classify_failure("Timeout", "request timed out after 30s"),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_failure("AllocError", "out of memory while decoding frame"),
            FailureKind::Resource
        );
    }

    #[test]
    fn test_classify_defaults_to_runtime() {
        assert_eq!(
            classify_failure("RuntimeError", "unexpected nil"),
            FailureKind::Runtime
        );
    }

    #[test]
    fn test_bookkeeping_round_trip() {
        let state = RetryBookkeeping {
            attempts: 2,
            last_retry_source: Some("auto".to_string()),
            ..RetryBookkeeping::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        let back: RetryBookkeeping = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
