// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::issue::{Issue, IssueReport, IssueStatus};
use crate::domain::models::job::merge_metadata;
use crate::domain::repositories::issue_repository::IssueRepository;
use crate::domain::repositories::RepositoryError;
use chrono::{DateTime, FixedOffset, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 问题去重服务
///
/// 以内容指纹聚合重复出现的运维问题：同一指纹再次出现时
/// 累加计数、刷新最近出现时间并重新打开；来自同一检查的
/// "健康"信号解除该指纹的问题。解除操作幂等。
pub struct IssueService<I: IssueRepository> {
    /// 问题仓库
    repository: Arc<I>,
}

impl<I: IssueRepository> IssueService<I> {
    /// 创建新的问题去重服务实例
    pub fn new(repository: Arc<I>) -> Self {
        Self { repository }
    }

    /// 以指纹插入或合并问题
    ///
    /// # 参数
    ///
    /// * `report` - 问题上报，指纹缺省时按内容计算
    ///
    /// # 返回值
    ///
    /// * `Ok(Issue)` - 插入或合并后的问题
    /// * `Err(RepositoryError)` - 仓库读写失败
    pub async fn upsert_issue(&self, report: IssueReport) -> Result<Issue, RepositoryError> {
        let fingerprint = report.resolve_fingerprint();
        let now: DateTime<FixedOffset> = Utc::now().into();

        match self.repository.find_by_fingerprint(&fingerprint).await? {
            Some(mut issue) => {
                issue.occurrences += 1;
                issue.last_seen_at = now;
                issue.severity = issue.severity.max(report.severity);
                issue.title = report.title;
                if report.details.is_some() {
                    issue.details = report.details;
                }
                if issue.status == IssueStatus::Resolved {
                    debug!(fingerprint = %fingerprint, "Reopening resolved issue");
                    issue.status = IssueStatus::Open;
                    issue.resolved_at = None;
                    issue.resolution_notes = None;
                }
                merge_metadata(&mut issue.metadata, &report.metadata);
                self.repository.update(&issue).await
            }
            None => {
                // 首次写入同样过一遍合并，保留键不落入自由元数据
                let mut metadata = serde_json::Value::Object(serde_json::Map::new());
                merge_metadata(&mut metadata, &report.metadata);
                let issue = Issue {
                    id: Uuid::new_v4(),
                    fingerprint,
                    issue_type: report.issue_type,
                    source: report.source,
                    severity: report.severity,
                    status: IssueStatus::Open,
                    title: report.title,
                    details: report.details,
                    occurrences: 1,
                    first_seen_at: now,
                    last_seen_at: now,
                    resolved_at: None,
                    resolution_notes: None,
                    context: report.context,
                    metadata,
                };
                counter!("issues_opened_total").increment(1);
                self.repository.insert(&issue).await
            }
        }
    }

    /// 按指纹解除问题
    ///
    /// 幂等：指纹不存在或已解除时为无操作
    pub async fn resolve_by_fingerprint(
        &self,
        fingerprint: &str,
        notes: Option<&str>,
    ) -> Result<Option<Issue>, RepositoryError> {
        let Some(mut issue) = self.repository.find_by_fingerprint(fingerprint).await? else {
            return Ok(None);
        };
        if issue.status == IssueStatus::Resolved {
            return Ok(Some(issue));
        }

        issue.status = IssueStatus::Resolved;
        issue.resolved_at = Some(Utc::now().into());
        issue.resolution_notes = notes.map(|n| n.to_string());
        info!(fingerprint = %fingerprint, "Issue resolved");
        counter!("issues_resolved_total").increment(1);
        self.repository.update(&issue).await.map(Some)
    }

    /// 按状态列出问题
    pub async fn list_issues(
        &self,
        status: Option<IssueStatus>,
        limit: u64,
    ) -> Result<Vec<Issue>, RepositoryError> {
        self.repository.list_by_status(status, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::issue::IssueSeverity;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct InMemoryIssueRepository {
        issues: Mutex<Vec<Issue>>,
    }

    impl InMemoryIssueRepository {
        fn new() -> Self {
            Self {
                issues: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IssueRepository for InMemoryIssueRepository {
        async fn find_by_fingerprint(
            &self,
            fingerprint: &str,
        ) -> Result<Option<Issue>, RepositoryError> {
            let issues = self.issues.lock().unwrap();
            Ok(issues.iter().find(|i| i.fingerprint == fingerprint).cloned())
        }

        async fn insert(&self, issue: &Issue) -> Result<Issue, RepositoryError> {
            let mut issues = self.issues.lock().unwrap();
            issues.push(issue.clone());
            Ok(issue.clone())
        }

        async fn update(&self, issue: &Issue) -> Result<Issue, RepositoryError> {
            let mut issues = self.issues.lock().unwrap();
            let slot = issues
                .iter_mut()
                .find(|i| i.id == issue.id)
                .ok_or(RepositoryError::NotFound)?;
            *slot = issue.clone();
            Ok(issue.clone())
        }

        async fn list_by_status(
            &self,
            status: Option<IssueStatus>,
            limit: u64,
        ) -> Result<Vec<Issue>, RepositoryError> {
            let issues = self.issues.lock().unwrap();
            Ok(issues
                .iter()
                .filter(|i| status.map_or(true, |s| i.status == s))
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn report_with_message(message: &str) -> IssueReport {
        let mut report = IssueReport::new(
            "job_failure",
            "media",
            IssueSeverity::Error,
            "Media encode keeps failing",
        );
        report.error_key = Some(message.to_string());
        report
    }

    #[tokio::test]
    async fn test_reports_differing_only_by_id_collapse() {
        let service = IssueService::new(Arc::new(InMemoryIssueRepository::new()));

        let first = service
            .upsert_issue(report_with_message("encode failed for post 12345"))
            .await
            .unwrap();
        let second = service
            .upsert_issue(report_with_message("encode failed for post 67"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.occurrences, 2);
    }

    #[tokio::test]
    async fn test_recurrence_reopens_resolved_issue() {
        let service = IssueService::new(Arc::new(InMemoryIssueRepository::new()));

        let issue = service
            .upsert_issue(report_with_message("boom"))
            .await
            .unwrap();
        service
            .resolve_by_fingerprint(&issue.fingerprint, Some("fixed upstream"))
            .await
            .unwrap();

        let reopened = service
            .upsert_issue(report_with_message("boom"))
            .await
            .unwrap();
        assert_eq!(reopened.status, IssueStatus::Open);
        assert!(reopened.resolved_at.is_none());
        assert_eq!(reopened.occurrences, 2);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let service = IssueService::new(Arc::new(InMemoryIssueRepository::new()));

        let missing = service
            .resolve_by_fingerprint("no-such-fingerprint", None)
            .await
            .unwrap();
        assert!(missing.is_none());

        let issue = service
            .upsert_issue(report_with_message("boom"))
            .await
            .unwrap();
        let resolved = service
            .resolve_by_fingerprint(&issue.fingerprint, None)
            .await
            .unwrap()
            .unwrap();
        let again = service
            .resolve_by_fingerprint(&issue.fingerprint, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.resolved_at, again.resolved_at);
    }

    #[tokio::test]
    async fn test_metadata_merges_instead_of_overwrite() {
        let service = IssueService::new(Arc::new(InMemoryIssueRepository::new()));

        let mut first = report_with_message("boom");
        first.metadata = serde_json::json!({"queue": "media", "first_job": "a"});
        service.upsert_issue(first).await.unwrap();

        let mut second = report_with_message("boom");
        second.metadata = serde_json::json!({"last_job": "b"});
        let merged = service.upsert_issue(second).await.unwrap();

        // queue 是保留键，不进入自由元数据
        assert_eq!(
            merged.metadata,
            serde_json::json!({"first_job": "a", "last_job": "b"})
        );
    }
}
