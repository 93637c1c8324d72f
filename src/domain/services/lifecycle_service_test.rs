use crate::domain::models::job::{
    JobContext, JobLifecycle, JobStatus, TransitionEvent, TransitionError, TransitionOutcome,
};
use crate::domain::repositories::lifecycle_repository::LifecycleRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::lifecycle_service::LifecycleService;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 测试用内存生命周期仓库
struct InMemoryLifecycleRepository {
    records: Mutex<Vec<JobLifecycle>>,
}

impl InMemoryLifecycleRepository {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LifecycleRepository for InMemoryLifecycleRepository {
    async fn find_by_job_id(&self, job_id: Uuid) -> Result<Option<JobLifecycle>, RepositoryError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| r.job_id == job_id).cloned())
    }

    async fn find_by_provider_id(
        &self,
        provider_job_id: &str,
    ) -> Result<Option<JobLifecycle>, RepositoryError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .find(|r| r.provider_job_id.as_deref() == Some(provider_job_id))
            .cloned())
    }

    async fn insert(&self, record: &JobLifecycle) -> Result<JobLifecycle, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(record.clone())
    }

    async fn update(&self, record: &JobLifecycle) -> Result<JobLifecycle, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record.clone();
        Ok(record.clone())
    }

    async fn stuck_running(
        &self,
        cutoff: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<Vec<JobLifecycle>, RepositoryError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.status == JobStatus::Running && r.last_transition_at < cutoff)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

fn service() -> LifecycleService<InMemoryLifecycleRepository> {
    LifecycleService::new(Arc::new(InMemoryLifecycleRepository::new()))
}

fn event_at(job_id: Uuid, status: JobStatus, at: &str) -> TransitionEvent {
    let mut event = TransitionEvent::new(job_id, "AnalysisJob", "analysis", status);
    event.occurred_at = at.parse().unwrap();
    event
}

#[tokio::test]
async fn test_out_of_order_transitions_converge_to_latest() {
    let service = service();
    let job_id = Uuid::new_v4();

    // The completion report arrives before the start report
    let done = event_at(job_id, JobStatus::Completed, "2025-06-01T10:00:30+00:00");
    let started = event_at(job_id, JobStatus::Running, "2025-06-01T10:00:10+00:00");

    let first = service.record_transition(done).await.unwrap();
    assert_eq!(first.outcome, TransitionOutcome::Applied);

    let second = service.record_transition(started).await.unwrap();
    assert_eq!(second.outcome, TransitionOutcome::Stale);

    let record = second.record.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(
        record.last_transition_at,
        "2025-06-01T10:00:30+00:00".parse::<DateTime<FixedOffset>>().unwrap()
    );
}

#[tokio::test]
async fn test_in_order_transitions_apply_normally() {
    let service = service();
    let job_id = Uuid::new_v4();

    let queued = event_at(job_id, JobStatus::Queued, "2025-06-01T10:00:00+00:00");
    let started = event_at(job_id, JobStatus::Running, "2025-06-01T10:00:10+00:00");
    let done = event_at(job_id, JobStatus::Completed, "2025-06-01T10:00:30+00:00");

    service.record_transition(queued).await.unwrap();
    service.record_transition(started).await.unwrap();
    let last = service.record_transition(done).await.unwrap();

    let record = last.record.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.queued_at.is_some());
    assert!(record.started_at.is_some());
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn test_identical_timestamp_tie_break_by_status_rank() {
    let service = service();
    let job_id = Uuid::new_v4();
    let at = "2025-06-01T12:00:00+00:00";

    let running = event_at(job_id, JobStatus::Running, at);
    let failed = event_at(job_id, JobStatus::Failed, at);

    service.record_transition(running).await.unwrap();
    let second = service.record_transition(failed).await.unwrap();
    assert_eq!(second.outcome, TransitionOutcome::Applied);
    assert_eq!(second.record.unwrap().status, JobStatus::Failed);

    // Same rank at the same timestamp keeps the stored record
    let completed = event_at(job_id, JobStatus::Completed, at);
    let third = service.record_transition(completed).await.unwrap();
    assert_eq!(third.outcome, TransitionOutcome::Stale);
    assert_eq!(third.record.unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn test_started_at_is_first_write_wins() {
    let service = service();
    let job_id = Uuid::new_v4();

    let first = event_at(job_id, JobStatus::Running, "2025-06-01T10:00:10+00:00");
    let second = event_at(job_id, JobStatus::Running, "2025-06-01T10:00:20+00:00");

    service.record_transition(first).await.unwrap();
    let recorded = service.record_transition(second).await.unwrap();

    let record = recorded.record.unwrap();
    assert_eq!(
        record.started_at,
        Some("2025-06-01T10:00:10+00:00".parse().unwrap())
    );
    // last_transition_at 仍然前进
    assert_eq!(
        record.last_transition_at,
        "2025-06-01T10:00:20+00:00".parse::<DateTime<FixedOffset>>().unwrap()
    );
}

#[tokio::test]
async fn test_unknown_status_is_ignored_not_an_error() {
    let service = service();
    let job_id = Uuid::new_v4();

    let queued = event_at(job_id, JobStatus::Queued, "2025-06-01T10:00:00+00:00");
    service.record_transition(queued).await.unwrap();

    let mut paused = event_at(job_id, JobStatus::Queued, "2025-06-01T10:00:05+00:00");
    paused.status = "paused".to_string();

    let recorded = service.record_transition(paused).await.unwrap();
    assert_eq!(recorded.outcome, TransitionOutcome::Ignored);
    assert_eq!(recorded.record.unwrap().status, JobStatus::Queued);
}

#[tokio::test]
async fn test_resolves_record_by_provider_id() {
    let service = service();
    let job_id = Uuid::new_v4();

    let mut queued = event_at(job_id, JobStatus::Queued, "2025-06-01T10:00:00+00:00");
    queued.provider_job_id = Some("sq-42".to_string());
    service.record_transition(queued).await.unwrap();

    // Backend-reported removal carries only the provider id
    let mut removed = event_at(Uuid::new_v4(), JobStatus::Removed, "2025-06-01T11:00:00+00:00");
    removed.provider_job_id = Some("sq-42".to_string());

    let recorded = service.record_transition(removed).await.unwrap();
    assert_eq!(recorded.outcome, TransitionOutcome::Applied);
    let record = recorded.record.unwrap();
    assert_eq!(record.job_id, job_id);
    assert_eq!(record.status, JobStatus::Removed);
    assert!(record.removed_at.is_some());
}

#[tokio::test]
async fn test_error_fields_only_set_on_failure() {
    let service = service();
    let job_id = Uuid::new_v4();

    let mut failed = event_at(job_id, JobStatus::Failed, "2025-06-01T10:01:00+00:00");
    failed.error = Some(TransitionError {
        class: "Net::ReadTimeout".to_string(),
        message: "read timed out".to_string(),
    });
    let recorded = service.record_transition(failed).await.unwrap();
    let record = recorded.record.unwrap();
    assert_eq!(record.error_class.as_deref(), Some("Net::ReadTimeout"));
    assert_eq!(record.error_message.as_deref(), Some("read timed out"));
}

#[tokio::test]
async fn test_scoping_ids_inherited_by_later_transitions() {
    let service = service();
    let job_id = Uuid::new_v4();
    let account = Uuid::new_v4();

    let mut queued = event_at(job_id, JobStatus::Queued, "2025-06-01T10:00:00+00:00");
    queued.context = JobContext {
        account_id: Some(account),
        ..JobContext::default()
    };
    queued.metadata = json!({"attempt": 1});
    service.record_transition(queued).await.unwrap();

    // Later transition arrives without scoping ids
    let mut done = event_at(job_id, JobStatus::Completed, "2025-06-01T10:00:30+00:00");
    done.metadata = json!({"worker": "w-3"});
    let recorded = service.record_transition(done).await.unwrap();

    let record = recorded.record.unwrap();
    assert_eq!(record.context.account_id, Some(account));
    assert_eq!(record.metadata, json!({"attempt": 1, "worker": "w-3"}));
}
