use common::delivery::Notice;
use common::{AssetStatus, RequestStatus};
use serde_json::json;
use uuid::Uuid;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn failed_asset_is_requeued_with_its_requests() {
    let app = TestApp::spawn().await;
    let id = app.add_asset("маша", AssetStatus::Failed, None).await;
    app.add_request(id, 1, RequestStatus::Failed).await;
    app.add_request(id, 2, RequestStatus::Failed).await;

    let res = app
        .post(&routes::asset_retry(id), &json!({ "user_id": 1 }))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["outcome"], "requeued");
    assert_eq!(res.body["reply"]["text"], Notice::Requeued.text());

    let asset = app.asset(id).await;
    assert_eq!(asset.status, AssetStatus::Pending);
    assert_eq!(asset.generation_attempts, 0);
    assert!(
        app.requests(id)
            .await
            .iter()
            .all(|r| r.status == RequestStatus::Pending)
    );
    assert_eq!(app.queue.jobs(), vec![id]);
}

#[tokio::test]
async fn available_asset_is_sent_again() {
    let app = TestApp::spawn().await;
    let id = app
        .add_asset("маша", AssetStatus::Available, Some("file-9"))
        .await;
    app.add_request(id, 5, RequestStatus::Completed).await;

    let res = app
        .post(&routes::asset_retry(id), &json!({ "user_id": 5 }))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["outcome"], "already_available");
    assert_eq!(app.gateway.videos_sent_to(5), vec!["file-9".to_string()]);
    assert!(app.queue.jobs().is_empty());
}

#[tokio::test]
async fn in_flight_asset_is_left_alone() {
    let app = TestApp::spawn().await;
    let id = app.add_asset("маша", AssetStatus::Generating, None).await;

    let res = app
        .post(&routes::asset_retry(id), &json!({ "user_id": 5 }))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["outcome"], "in_progress");
    assert_eq!(res.body["reply"]["text"], Notice::StillGenerating.text());
    assert_eq!(app.asset(id).await.status, AssetStatus::Generating);
    assert!(app.queue.jobs().is_empty());
}

#[tokio::test]
async fn unknown_asset_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .post(&routes::asset_retry(Uuid::now_v7()), &json!({ "user_id": 5 }))
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn asset_status_is_readable() {
    let app = TestApp::spawn().await;
    let id = app
        .add_asset("маша", AssetStatus::Available, Some("file-1"))
        .await;

    let res = app.get(&routes::asset(id)).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "Available");
    assert_eq!(res.body["name"], "маша");
    assert_eq!(res.body["has_handle"], true);

    let missing = app.get(&routes::asset(Uuid::now_v7())).await;
    assert_eq!(missing.status, 404);
}
