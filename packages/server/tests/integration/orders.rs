use std::sync::atomic::Ordering;

use common::delivery::Notice;
use common::{AssetStatus, RequestStatus};
use serde_json::json;
use uuid::Uuid;

use crate::common::{QUEUE, TestApp, routes};

fn asset_id(body: &serde_json::Value) -> Uuid {
    body["asset_id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("asset_id in response")
}

#[tokio::test]
async fn first_order_queues_a_generation_job() {
    let app = TestApp::spawn().await;

    let res = app.order(100, "Маша").await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "queued");
    assert_eq!(res.body["delivered"], false);
    assert_eq!(res.body["reply"]["text"], Notice::Queued.text());

    let id = asset_id(&res.body);
    assert_eq!(app.queue.jobs(), vec![id]);
    assert_eq!(app.queue.tasks.lock().unwrap()[0].0, QUEUE);
    assert_eq!(app.asset(id).await.name, "маша");
}

#[tokio::test]
async fn same_name_in_other_case_subscribes_without_new_job() {
    let app = TestApp::spawn().await;

    let first = app.order(100, "Маша").await;
    let second = app.order(200, "МАША").await;

    assert_eq!(second.status, 200);
    assert_eq!(second.body["status"], "subscribed");
    assert_eq!(second.body["reply"]["text"], Notice::Subscribed.text());
    assert_eq!(asset_id(&first.body), asset_id(&second.body));
    assert_eq!(app.queue.jobs().len(), 1);

    let requests = app.requests(asset_id(&first.body)).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].child_name, "МАША");
}

#[tokio::test]
async fn cached_order_is_delivered_immediately() {
    let app = TestApp::spawn().await;
    let id = app
        .add_asset("маша", AssetStatus::Available, Some("file-1"))
        .await;

    let res = app.order(300, "маша").await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "cached");
    assert_eq!(res.body["delivered"], true);
    assert!(res.body["reply"].is_null());
    assert_eq!(app.gateway.videos_sent_to(300), vec!["file-1".to_string()]);
    assert!(matches!(
        app.gateway.notices_for(300).as_slice(),
        [Notice::VideoReady { child_name }] if child_name == "маша"
    ));
    assert!(app.queue.jobs().is_empty());
    assert_eq!(app.requests(id).await[0].status, RequestStatus::Completed);
}

#[tokio::test]
async fn invalid_name_is_rejected_before_reserving() {
    let app = TestApp::spawn().await;

    for name in ["М", "Маша Петрова", "M4sha"] {
        let res = app.order(100, name).await;
        assert_eq!(res.status, 400, "name {name:?}");
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    assert!(app.asset_by_name("м").await.is_none());
    assert!(app.queue.jobs().is_empty());
}

#[tokio::test]
async fn configured_denylist_word_is_rejected() {
    let mut config = crate::common::test_config();
    config.validation.denylist = vec!["запрет".into()];
    let app = TestApp::spawn_with(config).await;

    let res = app.order(100, "Запрет").await;

    assert_eq!(res.status, 400);
    assert!(res.body["message"].as_str().unwrap().contains("недопустимые"));
}

#[tokio::test]
async fn age_out_of_range_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            routes::ORDERS,
            &json!({ "user_id": 1, "child_name": "Маша", "child_age": 19 }),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(app.asset_by_name("маша").await.is_none());
}

#[tokio::test]
async fn malformed_body_returns_structured_error() {
    let app = TestApp::spawn().await;

    let res = app.post(routes::ORDERS, &json!({ "child_name": "Маша" })).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn broker_outage_leaves_the_asset_pending() {
    let app = TestApp::spawn().await;
    app.queue.fail.store(true, Ordering::Relaxed);

    let res = app.order(100, "Маша").await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "queued");
    let id = asset_id(&res.body);
    assert_eq!(app.asset(id).await.status, AssetStatus::Pending);
    assert!(app.queue.jobs().is_empty());
}
