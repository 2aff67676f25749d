use serde_json::json;

use crate::integration::common::{TestApp, routes, valid_lead};

#[tokio::test]
async fn counts_start_empty() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::LEAD_COUNTS).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["total"], 0);
    assert_eq!(res.body["received"], 0);
    assert_eq!(res.body["delivered"], 0);
}

#[tokio::test]
async fn counts_reflect_received_leads() {
    let app = TestApp::spawn().await;

    app.create_lead(&valid_lead()).await;
    app.create_lead(&valid_lead()).await;

    let res = app.get(routes::LEAD_COUNTS).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["received"], 2);
    assert_eq!(res.body["total"], 2);
    assert_eq!(res.body["rejected"], 0);
}

#[tokio::test]
async fn recent_leads_newest_first_with_limit() {
    let app = TestApp::spawn().await;

    let first = app.create_lead(&valid_lead()).await;
    let second = app.create_lead(&valid_lead()).await;
    let third = app.create_lead(&valid_lead()).await;

    let res = app.get(&format!("{}?limit=2", routes::RECENT_LEADS)).await;
    assert_eq!(res.status, 200, "{}", res.text);

    let items = res.body.as_array().expect("array body");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"].as_i64(), Some(third));
    assert_eq!(items[1]["id"].as_i64(), Some(second));
    assert!(items.iter().all(|item| item["id"].as_i64() != Some(first)));
    assert_eq!(items[0]["status"], "RECEIVED");
}

#[tokio::test]
async fn history_unknown_lead_is_404() {
    let app = TestApp::spawn().await;

    let res = app.get(&routes::lead_history(999_999)).await;
    assert_eq!(res.status, 404);
    assert!(res.body["error"].is_string());
}

#[tokio::test]
async fn history_shows_snapshot_without_attempts() {
    let app = TestApp::spawn().await;

    let payload = valid_lead();
    let lead_id = app.create_lead(&payload).await;

    let res = app.get(&routes::lead_history(lead_id)).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["id"].as_i64(), Some(lead_id));
    assert_eq!(res.body["status"], "RECEIVED");
    assert_eq!(res.body["raw_payload"], payload);
    assert!(res.body.get("normalized_payload").is_none());
    assert_eq!(res.body["delivery_attempts"], json!([]));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::HEALTH).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["database"], "ok");
    assert_eq!(res.body["queue"], "ok");
}
