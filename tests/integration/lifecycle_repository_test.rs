use super::helpers::test_db;
use chrono::{Duration, Utc};
use jobpulse::domain::models::job::{JobStatus, TransitionEvent, TransitionOutcome};
use jobpulse::domain::repositories::lifecycle_repository::LifecycleRepository;
use jobpulse::domain::services::lifecycle_service::LifecycleService;
use jobpulse::infrastructure::repositories::lifecycle_repo_impl::LifecycleRepositoryImpl;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_transitions_persist_through_sqlite() {
    let db = test_db().await;
    let repo = Arc::new(LifecycleRepositoryImpl::new(db));
    let service = LifecycleService::new(repo.clone());

    let job_id = Uuid::new_v4();
    let mut queued = TransitionEvent::new(job_id, "AnalysisJob", "analysis", JobStatus::Queued);
    queued.provider_job_id = Some("sq-1001".to_string());
    queued.occurred_at = "2025-06-01T10:00:00+00:00".parse().unwrap();
    queued.metadata = serde_json::json!({"attempt": 1});

    let recorded = service.record_transition(queued).await.unwrap();
    assert_eq!(recorded.outcome, TransitionOutcome::Applied);

    let mut done = TransitionEvent::new(job_id, "AnalysisJob", "analysis", JobStatus::Completed);
    done.occurred_at = "2025-06-01T10:00:30+00:00".parse().unwrap();
    service.record_transition(done).await.unwrap();

    let record = repo.find_by_job_id(job_id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.queued_at.is_some());
    assert!(record.completed_at.is_some());
    assert_eq!(record.metadata, serde_json::json!({"attempt": 1}));

    // Provider-id lookup resolves the same row
    let by_provider = repo.find_by_provider_id("sq-1001").await.unwrap().unwrap();
    assert_eq!(by_provider.id, record.id);
}

#[tokio::test]
async fn test_stale_transition_discarded_on_real_store() {
    let db = test_db().await;
    let repo = Arc::new(LifecycleRepositoryImpl::new(db));
    let service = LifecycleService::new(repo.clone());

    let job_id = Uuid::new_v4();
    let mut done = TransitionEvent::new(job_id, "AnalysisJob", "analysis", JobStatus::Completed);
    done.occurred_at = "2025-06-01T10:00:30+00:00".parse().unwrap();
    service.record_transition(done).await.unwrap();

    let mut late_start = TransitionEvent::new(job_id, "AnalysisJob", "analysis", JobStatus::Running);
    late_start.occurred_at = "2025-06-01T10:00:10+00:00".parse().unwrap();
    let recorded = service.record_transition(late_start).await.unwrap();

    assert_eq!(recorded.outcome, TransitionOutcome::Stale);
    let record = repo.find_by_job_id(job_id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.started_at.is_none());
}

#[tokio::test]
async fn test_stuck_running_scan() {
    let db = test_db().await;
    let repo = Arc::new(LifecycleRepositoryImpl::new(db));
    let service = LifecycleService::new(repo.clone());

    let stuck_id = Uuid::new_v4();
    let mut old_start = TransitionEvent::new(stuck_id, "OcrJob", "media", JobStatus::Running);
    old_start.occurred_at = (Utc::now() - Duration::hours(2)).into();
    service.record_transition(old_start).await.unwrap();

    let fresh_id = Uuid::new_v4();
    let fresh_start = TransitionEvent::new(fresh_id, "OcrJob", "media", JobStatus::Running);
    service.record_transition(fresh_start).await.unwrap();

    let cutoff = (Utc::now() - Duration::minutes(30)).into();
    let stuck = repo.stuck_running(cutoff, 100).await.unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].job_id, stuck_id);
}
