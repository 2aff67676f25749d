use common::{LeadStatus, PROCESS_LEAD};
use queue::entity::background_job::{self, JobState};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use store::entity::lead;

use crate::integration::common::{TestApp, routes, valid_lead};
use server::config::AuthConfig;

#[tokio::test]
async fn webhook_accepts_lead_and_enqueues_job() {
    let app = TestApp::spawn().await;

    let res = app.post_json(routes::WEBHOOK, &valid_lead()).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "RECEIVED");

    let lead_id = res.body["lead_id"].as_i64().expect("lead_id in response");
    let correlation = res.body["correlation_id"].as_str().expect("correlation_id");
    assert_eq!(
        res.correlation_id.as_deref(),
        Some(correlation),
        "X-Correlation-ID header must echo the body"
    );

    // Lead row persisted as RECEIVED with the raw payload and a headers snapshot.
    let stored = lead::Entity::find_by_id(lead_id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("lead row");
    assert_eq!(stored.status, LeadStatus::Received);
    assert_eq!(stored.raw_payload, valid_lead());
    assert!(stored.rejection_reason.is_none());
    assert!(
        stored.source_headers.get("content-type").is_some(),
        "headers snapshot should capture content-type: {}",
        stored.source_headers
    );

    // A process_lead job carrying the lead id is pending.
    let job = background_job::Entity::find()
        .filter(background_job::Column::JobType.eq(PROCESS_LEAD))
        .one(&app.db)
        .await
        .unwrap()
        .expect("job row");
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.payload["lead_id"].as_i64(), Some(lead_id));
}

#[tokio::test]
async fn webhook_rejects_malformed_json() {
    let app = TestApp::spawn().await;

    let res = app.post_raw(routes::WEBHOOK, "{not json").await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["error"], "malformed JSON payload");
    assert!(res.body["correlation_id"].is_string());
    assert!(res.correlation_id.is_some());

    // Nothing persisted.
    let leads = lead::Entity::find().all(&app.db).await.unwrap();
    assert!(leads.is_empty());
}

#[tokio::test]
async fn webhook_accepts_any_json_document() {
    let app = TestApp::spawn().await;

    // Screening is the processor's job; ingest takes whatever parses.
    let res = app
        .post_json(routes::WEBHOOK, &json!({"unexpected": [1, 2, 3]}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
}

#[tokio::test]
async fn webhook_rejects_wrong_method() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::WEBHOOK).await;
    assert_eq!(res.status, 405);
}

#[tokio::test]
async fn webhook_auth_missing_secret() {
    let app = TestApp::spawn_with(AuthConfig {
        enabled: true,
        shared_secret: "s3cret".into(),
    })
    .await;

    let res = app.post_json(routes::WEBHOOK, &valid_lead()).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["error"], "missing authentication header");

    let leads = lead::Entity::find().all(&app.db).await.unwrap();
    assert!(leads.is_empty(), "nothing persisted on auth failure");
}

#[tokio::test]
async fn webhook_auth_wrong_secret() {
    let app = TestApp::spawn_with(AuthConfig {
        enabled: true,
        shared_secret: "s3cret".into(),
    })
    .await;

    let res = app
        .post_json_with_secret(routes::WEBHOOK, &valid_lead(), "wrong")
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["error"], "invalid authentication credentials");
}

#[tokio::test]
async fn webhook_auth_correct_secret() {
    let app = TestApp::spawn_with(AuthConfig {
        enabled: true,
        shared_secret: "s3cret".into(),
    })
    .await;

    let res = app
        .post_json_with_secret(routes::WEBHOOK, &valid_lead(), "s3cret")
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
}

#[tokio::test]
async fn webhook_happy_path_is_fast() {
    let app = TestApp::spawn().await;

    // Warm up the pool and the route once before measuring.
    app.post_json(routes::WEBHOOK, &valid_lead()).await;

    let start = std::time::Instant::now();
    let res = app.post_json(routes::WEBHOOK, &valid_lead()).await;
    let elapsed = start.elapsed();

    assert_eq!(res.status, 200);
    assert!(
        elapsed < std::time::Duration::from_millis(500),
        "handoff took {elapsed:?}, budget is 500ms"
    );
}
