use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{AssetStatus, RequestStatus};
use futures::future::join_all;
use server::reservation::{OrderRequest, Reservation, ReservationEngine};

use crate::common::TestApp;

fn order(user_id: i64, name: &str) -> OrderRequest {
    OrderRequest {
        user_id,
        name: name.to_lowercase(),
        child_name: name.to_string(),
        child_age: Some(5),
    }
}

fn engine(app: &TestApp) -> ReservationEngine {
    ReservationEngine::new(app.db.clone(), Duration::days(7))
}

#[tokio::test]
async fn concurrent_orders_elect_exactly_one_generator() {
    let app = TestApp::spawn().await;
    let engine = Arc::new(engine(&app));

    let results = join_all((0..10).map(|user_id| {
        let engine = engine.clone();
        async move { engine.reserve(&order(user_id, "Маша")).await }
    }))
    .await;

    let reservations: Vec<Reservation> = results
        .into_iter()
        .map(|r| r.expect("reservation succeeds"))
        .collect();
    let generators = reservations
        .iter()
        .filter(|r| matches!(r, Reservation::Generate { .. }))
        .count();
    assert_eq!(generators, 1);
    assert!(
        reservations
            .iter()
            .all(|r| !matches!(r, Reservation::ServeCached { .. }))
    );

    let asset_id = reservations[0].asset_id();
    assert!(reservations.iter().all(|r| r.asset_id() == asset_id));

    let requests = app.requests(asset_id).await;
    assert_eq!(requests.len(), 10);
    assert!(requests.iter().all(|r| r.status == RequestStatus::Pending));
    assert_eq!(app.asset(asset_id).await.status, AssetStatus::Pending);
}

#[tokio::test]
async fn fresh_available_asset_is_served_from_cache() {
    let app = TestApp::spawn().await;
    let asset_id = app
        .add_asset("маша", AssetStatus::Available, Some("file-1"))
        .await;

    let reservation = engine(&app).reserve(&order(7, "Маша")).await.unwrap();

    let Reservation::ServeCached {
        handle, request_id, ..
    } = reservation
    else {
        panic!("expected cached reservation, got {reservation:?}");
    };
    assert_eq!(handle, "file-1");
    let requests = app.requests(asset_id).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, request_id);
    assert_eq!(requests[0].status, RequestStatus::Completed);
}

#[tokio::test]
async fn expired_asset_starts_a_new_epoch() {
    let app = TestApp::spawn().await;
    let asset_id = app
        .add_asset("маша", AssetStatus::Available, Some("old-file"))
        .await;
    app.expire_asset(asset_id, Utc::now() - Duration::days(8))
        .await;

    let reservation = engine(&app).reserve(&order(7, "Маша")).await.unwrap();

    assert!(matches!(reservation, Reservation::Generate { .. }));
    assert_eq!(reservation.asset_id(), asset_id);
    let rearmed = app.asset(asset_id).await;
    assert_eq!(rearmed.status, AssetStatus::Pending);
    assert_eq!(rearmed.delivery_handle, None);
    assert_eq!(rearmed.generation_attempts, 0);
}

#[tokio::test]
async fn failed_asset_is_rearmed_by_a_new_order() {
    let app = TestApp::spawn().await;
    let asset_id = app.add_asset("маша", AssetStatus::Failed, None).await;
    app.add_request(asset_id, 1, RequestStatus::Failed).await;

    let reservation = engine(&app).reserve(&order(2, "Маша")).await.unwrap();

    assert!(matches!(reservation, Reservation::Generate { .. }));
    assert_eq!(app.asset(asset_id).await.status, AssetStatus::Pending);
    let requests = app.requests(asset_id).await;
    assert_eq!(requests[0].status, RequestStatus::Failed);
    assert_eq!(requests[1].status, RequestStatus::Pending);
}

#[tokio::test]
async fn in_flight_asset_gets_a_subscriber() {
    let app = TestApp::spawn().await;
    let asset_id = app.add_asset("маша", AssetStatus::Generating, None).await;

    let reservation = engine(&app).reserve(&order(3, "Маша")).await.unwrap();

    assert!(matches!(reservation, Reservation::Subscribed { .. }));
    assert_eq!(app.asset(asset_id).await.status, AssetStatus::Generating);
}
