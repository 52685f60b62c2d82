use chrono::Utc;
use common::delivery::Notice;
use common::entity::dead_letter_message;
use common::{
    AssetStatus, DlqEnvelope, DlqErrorCode, DlqMessageType, RequestStatus, RetryAttempt,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use server::consumers::record_dead_letter;
use uuid::Uuid;

use crate::common::{ADMIN_TOKEN, TestApp, routes, test_config};

fn envelope(asset_id: Option<Uuid>, failure_recorded: bool) -> DlqEnvelope {
    DlqEnvelope {
        message_id: format!("job-{}", Uuid::now_v7()),
        message_type: DlqMessageType::GenerationJob,
        asset_id,
        payload: json!({ "asset_id": asset_id }),
        error_code: DlqErrorCode::MaxRetriesExceeded,
        error_message: "TTS returned 503".into(),
        failure_recorded,
        retry_history: vec![
            RetryAttempt::new(1, "TTS returned 503"),
            RetryAttempt::new(2, "TTS returned 503"),
        ],
    }
}

async fn dead_letters(app: &TestApp) -> u64 {
    dead_letter_message::Entity::find()
        .count(&app.db)
        .await
        .unwrap()
}

mod consumer {
    use super::*;

    #[tokio::test]
    async fn envelope_is_persisted_once() {
        let app = TestApp::spawn().await;
        let env = envelope(None, true);

        let first = record_dead_letter(&app.db, &app.state.fanout, &env)
            .await
            .unwrap();
        let again = record_dead_letter(&app.db, &app.state.fanout, &env)
            .await
            .unwrap();

        assert_eq!(first.entry_id, again.entry_id);
        assert_eq!(dead_letters(&app).await, 1);

        let row = dead_letter_message::Entity::find_by_id(first.entry_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.error_code, "MAX_RETRIES_EXCEEDED");
        assert_eq!(row.message_type, "generation_job");
        assert_eq!(row.retry_count, 2);
        assert!(!row.resolved);
    }

    #[tokio::test]
    async fn unrecorded_failure_is_applied_by_the_server() {
        let app = TestApp::spawn().await;
        let asset_id = app.add_asset("маша", AssetStatus::Generating, None).await;
        app.add_request(asset_id, 1, RequestStatus::Pending).await;
        app.add_request(asset_id, 2, RequestStatus::Pending).await;
        app.add_request(asset_id, 1, RequestStatus::Pending).await;

        let outcome = record_dead_letter(&app.db, &app.state.fanout, &envelope(Some(asset_id), false))
            .await
            .unwrap();

        assert!(outcome.failed_here);
        assert_eq!(app.asset(asset_id).await.status, AssetStatus::Failed);
        assert!(
            app.requests(asset_id)
                .await
                .iter()
                .all(|r| r.status == RequestStatus::Failed)
        );
        for user in [1, 2] {
            assert_eq!(
                app.gateway.notices_for(user),
                vec![Notice::GenerationFailed { asset_id }]
            );
        }
    }

    #[tokio::test]
    async fn recorded_failure_is_not_repeated() {
        let app = TestApp::spawn().await;
        let asset_id = app.add_asset("маша", AssetStatus::Generating, None).await;
        app.add_request(asset_id, 1, RequestStatus::Pending).await;

        let outcome = record_dead_letter(&app.db, &app.state.fanout, &envelope(Some(asset_id), true))
            .await
            .unwrap();

        assert!(!outcome.failed_here);
        assert_eq!(app.asset(asset_id).await.status, AssetStatus::Generating);
        assert!(app.gateway.notices_for(1).is_empty());
    }

    #[tokio::test]
    async fn replayed_envelope_leaves_a_rearmed_asset_alone() {
        let app = TestApp::spawn().await;
        let asset_id = app.add_asset("маша", AssetStatus::Generating, None).await;
        app.add_request(asset_id, 1, RequestStatus::Pending).await;
        let env = envelope(Some(asset_id), false);

        let first = record_dead_letter(&app.db, &app.state.fanout, &env)
            .await
            .unwrap();
        assert!(first.failed_here);

        let rearmed = common::ledger::rearm_failed(&app.db, asset_id).await.unwrap();
        assert!(matches!(rearmed, common::ledger::RearmOutcome::Rearmed(_)));
        app.add_request(asset_id, 2, RequestStatus::Pending).await;

        let replay = record_dead_letter(&app.db, &app.state.fanout, &env)
            .await
            .unwrap();

        assert_eq!(replay.entry_id, first.entry_id);
        assert!(!replay.failed_here);
        assert_eq!(app.asset(asset_id).await.status, AssetStatus::Pending);
        assert!(
            app.requests(asset_id)
                .await
                .iter()
                .all(|r| r.status == RequestStatus::Pending)
        );
        assert_eq!(
            app.gateway.notices_for(1),
            vec![Notice::GenerationFailed { asset_id }]
        );
        assert!(app.gateway.notices_for(2).is_empty());
        assert_eq!(dead_letters(&app).await, 1);
    }

    #[tokio::test]
    async fn settled_asset_keeps_its_handle() {
        let app = TestApp::spawn().await;
        let asset_id = app
            .add_asset("маша", AssetStatus::Available, Some("file-1"))
            .await;

        let outcome = record_dead_letter(&app.db, &app.state.fanout, &envelope(Some(asset_id), false))
            .await
            .unwrap();

        assert!(!outcome.failed_here);
        let asset = app.asset(asset_id).await;
        assert_eq!(asset.status, AssetStatus::Available);
        assert_eq!(asset.delivery_handle.as_deref(), Some("file-1"));
    }
}

mod admin {
    use super::*;

    async fn seed(app: &TestApp, resolved: usize, unresolved: usize) -> Vec<i32> {
        let mut ids = Vec::new();
        for _ in 0..resolved + unresolved {
            let outcome = record_dead_letter(&app.db, &app.state.fanout, &envelope(None, true))
                .await
                .unwrap();
            ids.push(outcome.entry_id);
        }
        for id in ids.iter().take(resolved) {
            server::dlq::dlq_service(&app.db)
                .resolve(*id, Some("seed".into()))
                .await
                .unwrap();
        }
        ids
    }

    #[tokio::test]
    async fn listing_requires_the_admin_token() {
        let app = TestApp::spawn().await;

        let missing = app.get(routes::DLQ).await;
        assert_eq!(missing.status, 401);
        assert_eq!(missing.body["code"], "TOKEN_MISSING");

        let wrong = app.get_with_token(routes::DLQ, "nope").await;
        assert_eq!(wrong.status, 401);
        assert_eq!(wrong.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn empty_configured_token_rejects_everyone() {
        let mut config = test_config();
        config.admin.token = String::new();
        let app = TestApp::spawn_with(config).await;

        let res = app.get_with_token(routes::DLQ, "").await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn admin_lists_and_filters_messages() {
        let app = TestApp::spawn().await;
        seed(&app, 1, 2).await;

        let all = app.get_with_token(routes::DLQ, ADMIN_TOKEN).await;
        assert_eq!(all.status, 200);
        assert_eq!(all.body["data"].as_array().unwrap().len(), 3);
        assert_eq!(all.body["pagination"]["total"], 3);

        let open = app
            .get_with_token(&format!("{}?resolved=false", routes::DLQ), ADMIN_TOKEN)
            .await;
        assert_eq!(open.body["pagination"]["total"], 2);

        let paged = app
            .get_with_token(&format!("{}?page=2&per_page=2", routes::DLQ), ADMIN_TOKEN)
            .await;
        assert_eq!(paged.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(paged.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn resolve_marks_message_once() {
        let app = TestApp::spawn().await;
        let ids = seed(&app, 0, 1).await;

        let res = app
            .post_with_token(
                &routes::dlq_resolve(ids[0]),
                &json!({ "resolved_by": "ops" }),
                ADMIN_TOKEN,
            )
            .await;
        assert_eq!(res.status, 200);

        let row = dead_letter_message::Entity::find_by_id(ids[0])
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(row.resolved);
        assert!(row.resolved_at.is_some_and(|at| at <= Utc::now()));
        assert_eq!(row.resolved_by.as_deref(), Some("ops"));

        let again = app
            .post_with_token(&routes::dlq_resolve(ids[0]), &json!({}), ADMIN_TOKEN)
            .await;
        assert_eq!(again.status, 409);
        assert_eq!(again.body["code"], "CONFLICT");

        let missing = app
            .post_with_token(&routes::dlq_resolve(999_999), &json!({}), ADMIN_TOKEN)
            .await;
        assert_eq!(missing.status, 404);
    }
}
