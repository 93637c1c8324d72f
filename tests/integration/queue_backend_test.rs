use super::helpers::test_db;
use chrono::Utc;
use jobpulse::infrastructure::database::entities::queue_worker;
use jobpulse::queue::backend::{DispatchRequest, InFlightState, QueueBackend};
use jobpulse::queue::database_backend::DatabaseQueueBackend;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use uuid::Uuid;

fn dispatch_request(queue: &str) -> DispatchRequest {
    DispatchRequest {
        job_id: None,
        job_class: "MediaEncodeJob".to_string(),
        queue: queue.to_string(),
        arguments: json!({"post_id": 7}),
        scheduled_at: None,
    }
}

#[tokio::test]
async fn test_dispatch_and_introspection() {
    let db = test_db().await;
    let backend = DatabaseQueueBackend::new(db);

    assert_eq!(backend.queue_depth("media").await.unwrap(), 0);

    let dispatched = backend.dispatch(dispatch_request("media")).await.unwrap();
    backend.dispatch(dispatch_request("media")).await.unwrap();
    backend.dispatch(dispatch_request("analysis")).await.unwrap();

    assert_eq!(backend.queue_depth("media").await.unwrap(), 2);
    assert_eq!(backend.queue_depth("analysis").await.unwrap(), 1);

    let state = backend.find_in_flight(dispatched.job_id).await.unwrap();
    assert_eq!(state, Some(InFlightState::Pending));
    assert!(backend.find_in_flight(Uuid::new_v4()).await.unwrap().is_none());

    let enqueued_at = backend.enqueued_at(dispatched.job_id).await.unwrap();
    assert!(enqueued_at.is_some());

    let latency = backend.queue_latency_ms("media").await.unwrap();
    assert!(latency.unwrap() >= 0);
}

#[tokio::test]
async fn test_retry_dispatch_reuses_job_id() {
    let db = test_db().await;
    let backend = DatabaseQueueBackend::new(db);

    let job_id = Uuid::new_v4();
    let mut request = dispatch_request("media");
    request.job_id = Some(job_id);

    let dispatched = backend.dispatch(request).await.unwrap();
    assert_eq!(dispatched.job_id, job_id);
    assert_eq!(
        backend.find_in_flight(job_id).await.unwrap(),
        Some(InFlightState::Pending)
    );
}

#[tokio::test]
async fn test_workers_reads_recent_heartbeats() {
    let db = test_db().await;

    let alive = queue_worker::ActiveModel {
        id: Set(Uuid::new_v4()),
        hostname: Set("worker-a".to_string()),
        concurrency: Set(4),
        queues: Set(json!(["media", "analysis"])),
        last_heartbeat_at: Set(Utc::now().into()),
    };
    alive.insert(db.as_ref()).await.unwrap();

    let dead = queue_worker::ActiveModel {
        id: Set(Uuid::new_v4()),
        hostname: Set("worker-b".to_string()),
        concurrency: Set(2),
        queues: Set(json!(["media"])),
        last_heartbeat_at: Set((Utc::now() - chrono::Duration::hours(1)).into()),
    };
    dead.insert(db.as_ref()).await.unwrap();

    let backend = DatabaseQueueBackend::new(db);
    let workers = backend.workers().await.unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].hostname, "worker-a");
    assert_eq!(workers[0].concurrency, 4);
    assert_eq!(workers[0].queues, vec!["media", "analysis"]);
}
