use common::delivery::Notice;
use common::entity::bot_user;
use sea_orm::EntityTrait;
use serde_json::{Value, json};

use crate::common::{TestApp, routes};

async fn send(app: &TestApp, user_id: i64, event: Value) -> Value {
    let res = app.post(&routes::conversation_events(user_id), &event).await;
    assert_eq!(res.status, 200, "event {event} -> {}", res.body);
    res.body
}

fn texts(body: &Value) -> Vec<String> {
    body["replies"]
        .as_array()
        .expect("replies")
        .iter()
        .map(|r| r["text"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn new_user_orders_through_the_whole_dialogue() {
    let app = TestApp::spawn().await;
    let user = 4242;

    let body = send(&app, user, json!({ "type": "start" })).await;
    assert_eq!(body["state"]["step"], "awaiting_phone");
    assert_eq!(body["replies"][0]["request_contact"], true);

    let body = send(
        &app,
        user,
        json!({ "type": "contact", "phone_number": "+79990001122", "first_name": "Анна" }),
    )
    .await;
    assert_eq!(body["state"]["step"], "awaiting_name");
    let saved = bot_user::Entity::find_by_id(user)
        .one(&app.db)
        .await
        .unwrap()
        .expect("user saved");
    assert_eq!(saved.phone_number.as_deref(), Some("+79990001122"));
    assert_eq!(saved.first_name.as_deref(), Some("Анна"));

    let body = send(&app, user, json!({ "type": "text", "text": "Маша" })).await;
    assert_eq!(body["state"]["step"], "awaiting_age");
    assert_eq!(body["state"]["child_name"], "Маша");

    let body = send(&app, user, json!({ "type": "text", "text": "6" })).await;
    assert_eq!(body["state"]["step"], "awaiting_confirmation");
    assert!(texts(&body)[0].contains("6 лет"));

    let body = send(&app, user, json!({ "type": "confirm" })).await;
    assert_eq!(body["state"]["step"], "idle");
    assert_eq!(texts(&body), vec![Notice::Queued.text()]);

    let asset = app.asset_by_name("маша").await.expect("asset reserved");
    let requests = app.requests(asset.id).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_id, user);
    assert_eq!(requests[0].child_age, Some(6));
    assert_eq!(app.queue.jobs(), vec![asset.id]);
}

#[tokio::test]
async fn returning_user_skips_the_phone_step() {
    let app = TestApp::spawn().await;
    send(&app, 7, json!({ "type": "start" })).await;
    send(&app, 7, json!({ "type": "contact", "phone_number": "+79990001122" })).await;
    send(&app, 7, json!({ "type": "text", "text": "/cancel" })).await;

    let body = send(&app, 7, json!({ "type": "text", "text": "/start" })).await;

    assert_eq!(body["state"]["step"], "awaiting_name");
    assert!(texts(&body)[0].starts_with("С возвращением"));
}

#[tokio::test]
async fn invalid_name_keeps_the_dialogue_on_the_name_step() {
    let app = TestApp::spawn().await;
    send(&app, 8, json!({ "type": "start" })).await;
    send(&app, 8, json!({ "type": "contact", "phone_number": "+79990001122" })).await;

    let body = send(&app, 8, json!({ "type": "text", "text": "Маша Петрова" })).await;

    assert_eq!(body["state"]["step"], "awaiting_name");
    assert!(texts(&body)[0].contains("одно слово"));
    assert!(app.asset_by_name("маша петрова").await.is_none());
}

#[tokio::test]
async fn order_another_while_idle_restarts_at_name() {
    let app = TestApp::spawn().await;
    send(&app, 9, json!({ "type": "start" })).await;
    send(&app, 9, json!({ "type": "contact", "phone_number": "+79990001122" })).await;
    send(&app, 9, json!({ "type": "text", "text": "/cancel" })).await;

    let body = send(&app, 9, json!({ "type": "order_another" })).await;
    assert_eq!(body["state"]["step"], "awaiting_name");

    let body = send(&app, 9, json!({ "type": "order_another" })).await;
    assert_eq!(body["state"]["step"], "awaiting_name");
    assert!(texts(&body)[0].contains("дождитесь"));
}

#[tokio::test]
async fn unknown_event_type_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let res = app
        .post(&routes::conversation_events(1), &json!({ "type": "dance" }))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn double_tapped_confirm_places_one_order() {
    let app = TestApp::spawn().await;
    let user = 11;
    send(&app, user, json!({ "type": "start" })).await;
    send(&app, user, json!({ "type": "contact", "phone_number": "+79990001122" })).await;
    send(&app, user, json!({ "type": "text", "text": "Лиза" })).await;
    send(&app, user, json!({ "type": "text", "text": "4" })).await;

    let confirm = json!({ "type": "confirm" });
    let (first, second) = tokio::join!(
        send(&app, user, confirm.clone()),
        send(&app, user, confirm.clone()),
    );

    assert_eq!(first["state"]["step"], "idle");
    assert_eq!(second["state"]["step"], "idle");
    let asset = app.asset_by_name("лиза").await.expect("asset reserved");
    assert_eq!(app.requests(asset.id).await.len(), 1);
    assert_eq!(app.queue.jobs(), vec![asset.id]);
}
