use common::LeadStatus;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;
use store::entity::{delivery_attempt, lead};
use tokio_util::sync::CancellationToken;
use worker::Processor;
use worker::config::{
    AttributesConfig, CustomerApiConfig, DatabaseConfig, LoggingConfig, NormalizationConfig,
    RetryConfig, ValidationConfig, WorkerAppConfig, WorkerSettings,
};

use crate::integration::common::{MockCustomerApi, TestApp, routes, valid_lead};

/// Attribute catalog used by the end-to-end scenarios: one optional dropdown.
fn write_catalog() -> String {
    let dir = std::env::temp_dir().join(format!("leadgate-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create catalog dir");
    let path = dir.join("customer_attributes.json");
    std::fs::write(
        &path,
        r#"{"roof_type": {"type": "dropdown", "required": false, "options": ["flat", "gabled"]}}"#,
    )
    .expect("write catalog");
    path.to_string_lossy().into_owned()
}

/// Processor wired against the test database and the mock downstream, with a
/// zero backoff base so retry rounds run back to back.
fn spawn_processor(app: &TestApp, mock_url: &str) -> Processor {
    let config = WorkerAppConfig {
        database: DatabaseConfig {
            url: app.db_url.clone(),
            max_connections: 5,
            min_connections: 1,
        },
        customer_api: CustomerApiConfig {
            url: mock_url.to_string(),
            token: "test-token".into(),
            timeout_secs: 5,
            product_name: "solar_premium".into(),
        },
        worker: WorkerSettings::default(),
        retry: RetryConfig {
            max_attempts: 5,
            backoff_base_secs: 0,
        },
        validation: ValidationConfig::default(),
        normalization: NormalizationConfig::default(),
        attributes: AttributesConfig {
            path: write_catalog(),
        },
        logging: LoggingConfig::default(),
    };

    Processor::new(app.db.clone(), app.queue_handle(), &config).expect("processor")
}

/// Run jobs until the queue is drained.
async fn drain(processor: &Processor) {
    let cancel = CancellationToken::new();
    while processor
        .process_next(&cancel)
        .await
        .expect("job processing")
    {}
}

async fn load_lead(app: &TestApp, id: i64) -> lead::Model {
    lead::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("lead row")
}

async fn load_attempts(app: &TestApp, lead_id: i64) -> Vec<delivery_attempt::Model> {
    delivery_attempt::Entity::find()
        .filter(delivery_attempt::Column::LeadId.eq(lead_id))
        .order_by_asc(delivery_attempt::Column::AttemptNo)
        .all(&app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn happy_path_delivers_lead() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![200]).await;
    let processor = spawn_processor(&app, &mock.url);

    let lead_id = app.create_lead(&valid_lead()).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::Delivered);

    let customer_payload = stored.customer_payload.expect("customer payload stored");
    assert_eq!(customer_payload["phone"], "49123456");
    assert_eq!(customer_payload["product"]["name"], "solar_premium");
    assert_eq!(customer_payload["email"], "a@b");

    // The mock saw exactly the stored payload.
    assert_eq!(mock.call_count(), 1);
    assert_eq!(mock.last_body().unwrap(), customer_payload);

    let attempts = load_attempts(&app, lead_id).await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].attempt_no, 1);
    assert!(attempts[0].success);
    assert_eq!(attempts[0].response_status, Some(200));
    assert!(attempts[0].response_body.is_some());

    // Terminal state is also visible through the history endpoint.
    let history = app.get(&routes::lead_history(lead_id)).await;
    assert_eq!(history.body["status"], "DELIVERED");
    assert_eq!(history.body["delivery_attempts"][0]["success"], true);
}

#[tokio::test]
async fn geographic_rejection() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![200]).await;
    let processor = spawn_processor(&app, &mock.url);

    let mut payload = valid_lead();
    payload["zipcode"] = json!("12345");
    let lead_id = app.create_lead(&payload).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::Rejected);
    assert_eq!(stored.rejection_reason.as_deref(), Some("ZIPCODE_INVALID"));
    assert!(stored.customer_payload.is_none());

    assert_eq!(mock.call_count(), 0);
    assert!(load_attempts(&app, lead_id).await.is_empty());
}

#[tokio::test]
async fn ownership_rejection() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![200]).await;
    let processor = spawn_processor(&app, &mock.url);

    let mut payload = valid_lead();
    payload["house"] = json!({"is_owner": false});
    let lead_id = app.create_lead(&payload).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::Rejected);
    assert_eq!(stored.rejection_reason.as_deref(), Some("NOT_HOMEOWNER"));

    assert_eq!(mock.call_count(), 0);
    assert!(load_attempts(&app, lead_id).await.is_empty());
}

#[tokio::test]
async fn permissive_optional_attribute_is_dropped() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![200]).await;
    let processor = spawn_processor(&app, &mock.url);

    let mut payload = valid_lead();
    payload["roof_type"] = json!("unlisted_label");
    let lead_id = app.create_lead(&payload).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::Delivered);

    let customer_payload = stored.customer_payload.expect("customer payload stored");
    assert!(
        customer_payload.get("roof_type").is_none(),
        "invalid optional dropdown must be dropped: {customer_payload}"
    );
    assert!(mock.last_body().unwrap().get("roof_type").is_none());

    assert_eq!(load_attempts(&app, lead_id).await.len(), 1);
}

#[tokio::test]
async fn retry_exhaustion_records_all_attempts() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![503]).await;
    let processor = spawn_processor(&app, &mock.url);

    let lead_id = app.create_lead(&valid_lead()).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::PermanentlyFailed);
    assert_eq!(mock.call_count(), 5);

    let attempts = load_attempts(&app, lead_id).await;
    assert_eq!(attempts.len(), 5);
    for (i, attempt) in attempts.iter().enumerate() {
        assert_eq!(attempt.attempt_no, i as i32 + 1);
        assert!(!attempt.success);
        assert_eq!(attempt.response_status, Some(503));
        assert!(attempt.error_message.is_some());
    }

    // Attempts are ordered in time as well as by number.
    for pair in attempts.windows(2) {
        assert!(pair[0].requested_at <= pair[1].requested_at);
    }
}

#[tokio::test]
async fn non_retriable_failure_stops_immediately() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![422]).await;
    let processor = spawn_processor(&app, &mock.url);

    let lead_id = app.create_lead(&valid_lead()).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::PermanentlyFailed);
    assert_eq!(mock.call_count(), 1);

    let attempts = load_attempts(&app, lead_id).await;
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].success);
    assert_eq!(attempts[0].response_status, Some(422));
}

#[tokio::test]
async fn recovery_after_transient_failures() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![503, 503, 200]).await;
    let processor = spawn_processor(&app, &mock.url);

    let lead_id = app.create_lead(&valid_lead()).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::Delivered);
    assert_eq!(mock.call_count(), 3);

    let attempts = load_attempts(&app, lead_id).await;
    assert_eq!(attempts.len(), 3);
    assert!(!attempts[0].success);
    assert!(!attempts[1].success);
    assert!(attempts[2].success);
    assert_eq!(attempts[2].attempt_no, 3);
}

#[tokio::test]
async fn mapping_failure_is_permanent_without_attempts() {
    let app = TestApp::spawn().await;
    let mock = MockCustomerApi::spawn(vec![200]).await;
    let processor = spawn_processor(&app, &mock.url);

    let mut payload = valid_lead();
    payload.as_object_mut().unwrap().remove("phone");
    let lead_id = app.create_lead(&payload).await;
    drain(&processor).await;

    let stored = load_lead(&app, lead_id).await;
    assert_eq!(stored.status, LeadStatus::PermanentlyFailed);
    assert!(stored.customer_payload.is_none());

    assert_eq!(mock.call_count(), 0);
    assert!(load_attempts(&app, lead_id).await.is_empty());
}
