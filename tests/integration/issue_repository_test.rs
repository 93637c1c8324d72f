use super::helpers::test_db;
use jobpulse::domain::models::issue::{IssueReport, IssueSeverity, IssueStatus};
use jobpulse::domain::services::issue_service::IssueService;
use jobpulse::infrastructure::repositories::issue_repo_impl::IssueRepositoryImpl;
use std::sync::Arc;

fn report(message: &str) -> IssueReport {
    let mut report = IssueReport::new(
        "job_failure",
        "scraping",
        IssueSeverity::Error,
        "Scrape jobs failing",
    );
    report.error_key = Some(message.to_string());
    report
}

#[tokio::test]
async fn test_upsert_and_resolve_round_trip() {
    let db = test_db().await;
    let service = IssueService::new(Arc::new(IssueRepositoryImpl::new(db)));

    let first = service
        .upsert_issue(report("fetch failed for page 311"))
        .await
        .unwrap();
    assert_eq!(first.occurrences, 1);
    assert_eq!(first.status, IssueStatus::Open);

    // 只差内嵌ID的消息落到同一条记录
    let second = service
        .upsert_issue(report("fetch failed for page 7890"))
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.occurrences, 2);

    let resolved = service
        .resolve_by_fingerprint(&first.fingerprint, Some("source healthy"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.status, IssueStatus::Resolved);

    let open = service
        .list_issues(Some(IssueStatus::Open), 50)
        .await
        .unwrap();
    assert!(open.is_empty());
    let all = service.list_issues(None, 50).await.unwrap();
    assert_eq!(all.len(), 1);
}
