// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobContext;
use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

static UUID_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("uuid regex")
});
static HEX_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:0x)?[0-9a-fA-F]{6,}\b").expect("hex regex"));
static NUMBER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("number regex"));

/// 问题状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// 待处理
    #[default]
    Open,
    /// 处理中
    Pending,
    /// 已解决
    Resolved,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::Pending => write!(f, "pending"),
            IssueStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl FromStr for IssueStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(IssueStatus::Open),
            "pending" => Ok(IssueStatus::Pending),
            "resolved" => Ok(IssueStatus::Resolved),
            _ => Err(()),
        }
    }
}

/// 问题严重程度枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// 提示
    Info,
    /// 警告
    #[default]
    Warning,
    /// 错误
    Error,
    /// 严重
    Critical,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for IssueSeverity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(IssueSeverity::Info),
            "warning" => Ok(IssueSeverity::Warning),
            "error" => Ok(IssueSeverity::Error),
            "critical" => Ok(IssueSeverity::Critical),
            _ => Err(()),
        }
    }
}

/// 运维问题记录
///
/// 以内容指纹去重；同一指纹重复出现时累加计数并重新打开
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// 记录唯一标识符
    pub id: Uuid,
    /// 内容指纹
    pub fingerprint: String,
    /// 问题类型
    pub issue_type: String,
    /// 问题来源（检查名/队列名）
    pub source: String,
    /// 严重程度
    pub severity: IssueSeverity,
    /// 状态
    pub status: IssueStatus,
    /// 标题
    pub title: String,
    /// 详情
    pub details: Option<String>,
    /// 累计出现次数
    pub occurrences: i64,
    /// 首次出现时间
    pub first_seen_at: DateTime<FixedOffset>,
    /// 最近出现时间
    pub last_seen_at: DateTime<FixedOffset>,
    /// 解决时间
    pub resolved_at: Option<DateTime<FixedOffset>>,
    /// 解决备注
    pub resolution_notes: Option<String>,
    /// 作用域上下文
    pub context: JobContext,
    /// 自由元数据
    pub metadata: Value,
}

/// 问题上报输入
#[derive(Debug, Clone)]
pub struct IssueReport {
    /// 问题类型
    pub issue_type: String,
    /// 问题来源
    pub source: String,
    /// 严重程度
    pub severity: IssueSeverity,
    /// 标题
    pub title: String,
    /// 详情
    pub details: Option<String>,
    /// 用于指纹的错误键（原始消息，归一化后参与哈希）
    pub error_key: Option<String>,
    /// 显式指纹，缺省时按内容计算
    pub fingerprint: Option<String>,
    /// 作用域上下文
    pub context: JobContext,
    /// 附加元数据
    pub metadata: Value,
}

impl IssueReport {
    /// 创建一个新的问题上报
    pub fn new(issue_type: &str, source: &str, severity: IssueSeverity, title: &str) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            source: source.to_string(),
            severity,
            title: title.to_string(),
            details: None,
            error_key: None,
            fingerprint: None,
            context: JobContext::default(),
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    /// 取显式指纹或按内容计算
    pub fn resolve_fingerprint(&self) -> String {
        match &self.fingerprint {
            Some(fp) => fp.clone(),
            None => compute_fingerprint(
                &self.issue_type,
                &self.source,
                &self.context,
                self.error_key.as_deref(),
            ),
        }
    }
}

/// 归一化错误键
///
/// 数字串与十六进制样式的片段替换为占位符，
/// 仅相差一个ID或时间戳的消息收敛到同一指纹
pub fn normalize_error_key(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let no_uuid = UUID_TOKEN.replace_all(&lowered, "<uuid>");
    let no_hex = HEX_TOKEN.replace_all(&no_uuid, "<hex>");
    NUMBER_RUN.replace_all(&no_hex, "<n>").into_owned()
}

/// 计算内容指纹
///
/// SHA-256(问题类型 | 来源 | 作用域ID | 归一化错误键)
pub fn compute_fingerprint(
    issue_type: &str,
    source: &str,
    context: &JobContext,
    error_key: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issue_type.as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    if let Some(account) = context.account_id {
        hasher.update(account.as_bytes());
    }
    if let Some(entity) = context.entity_id {
        hasher.update(entity.as_bytes());
    }
    if let Some(related_type) = &context.related_type {
        hasher.update(related_type.as_bytes());
    }
    if let Some(related) = context.related_id {
        hasher.update(related.as_bytes());
    }
    hasher.update(b"|");
    if let Some(key) = error_key {
        hasher.update(normalize_error_key(key).as_bytes());
    }
    hex::encode(hasher.finalize())
}
