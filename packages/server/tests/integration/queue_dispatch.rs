use std::collections::HashSet;
use std::time::Duration;

use queue::JobQueue;
use queue::entity::background_job::{self, JobState};
use sea_orm::EntityTrait;
use serde_json::json;

use crate::integration::common::TestApp;

#[tokio::test]
async fn dequeue_claims_job_exactly_once() {
    let app = TestApp::spawn().await;
    let queue = app.queue_handle();

    let job_id = queue
        .enqueue("process_lead", json!({"lead_id": 1}), Duration::ZERO)
        .await
        .unwrap();

    let job = queue.dequeue().await.unwrap().expect("job dispatchable");
    assert_eq!(job.id, job_id);
    assert_eq!(job.attempts, 1, "dispatch increments the attempt counter");

    // The row is now processing, so a second dequeue finds nothing.
    assert!(queue.dequeue().await.unwrap().is_none());

    queue.complete(&job).await.unwrap();
    let stored = background_job::Entity::find_by_id(job.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, JobState::Completed);
    assert!(stored.completed_at.is_some());
}

#[tokio::test]
async fn delayed_job_is_not_dispatchable_until_due() {
    let app = TestApp::spawn().await;
    let queue = app.queue_handle();

    queue
        .enqueue(
            "process_lead",
            json!({"lead_id": 2}),
            Duration::from_secs(3600),
        )
        .await
        .unwrap();

    assert!(
        queue.dequeue().await.unwrap().is_none(),
        "job with future next_run_at must not dispatch"
    );
}

#[tokio::test]
async fn retry_reschedules_and_fail_is_terminal() {
    let app = TestApp::spawn().await;
    let queue = app.queue_handle();

    queue
        .enqueue("process_lead", json!({"lead_id": 3}), Duration::ZERO)
        .await
        .unwrap();
    let job = queue.dequeue().await.unwrap().unwrap();

    // Retry with zero delay makes it immediately dispatchable again.
    queue.retry(&job, Duration::ZERO).await.unwrap();
    let again = queue.dequeue().await.unwrap().expect("retried job");
    assert_eq!(again.id, job.id);
    assert_eq!(again.attempts, 2);

    queue.fail(&again, "boom").await.unwrap();
    let stored = background_job::Entity::find_by_id(job.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, JobState::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("boom"));
    assert!(stored.failed_at.is_some());

    assert!(queue.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_workers_never_share_a_job() {
    let app = TestApp::spawn().await;
    let queue = app.queue_handle();

    const JOBS: usize = 20;
    for i in 0..JOBS {
        queue
            .enqueue("process_lead", json!({"lead_id": i}), Duration::ZERO)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let queue = app.queue_handle();
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(job) = queue.dequeue().await.unwrap() {
                claimed.push(job.id);
                queue.complete(&job).await.unwrap();
            }
            claimed
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let unique: HashSet<i64> = all.iter().copied().collect();
    assert_eq!(all.len(), JOBS, "every job claimed");
    assert_eq!(unique.len(), JOBS, "no job claimed twice");
}

#[tokio::test]
async fn health_check_passes() {
    let app = TestApp::spawn().await;
    assert!(app.queue_handle().health().await.is_ok());
}
