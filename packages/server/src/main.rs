use std::sync::Arc;

use anyhow::Context;
use common::database::init_db;
use common::delivery::{CouponDispatcher, DeliveryGateway, Fanout, TelegramGateway};
use mq::{JobQueue, MqConfig, init_mq};
use server::config::AppConfig;
use server::consumers::consume_generation_dlq;
use server::dlq::run_reconciliation_sweep;
use server::state::AppState;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database connected");

    let mq = Arc::new(
        init_mq(MqConfig::from(&config.mq))
            .await
            .context("Failed to initialize MQ")?,
    );
    info!(
        queue_name = %config.mq.queue_name,
        dlq_queue_name = %config.mq.dlq_queue_name,
        "MQ connected"
    );

    if config.admin.token.is_empty() {
        warn!("admin.token is empty, DLQ endpoints will reject every request");
    }

    let gateway: Arc<dyn DeliveryGateway> = Arc::new(TelegramGateway::new(&config.telegram));
    let coupons = CouponDispatcher::new(db.clone(), gateway.clone(), config.coupons.clone());
    let fanout = Fanout::new(gateway, coupons);

    let queue: Arc<dyn JobQueue> = mq.clone();
    let dlq_queue_name = config.mq.dlq_queue_name.clone();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let reconcile_enabled = config.reconcile.enabled;

    let state = AppState::new(db.clone(), queue, fanout.clone(), config);

    tokio::spawn(consume_generation_dlq(db, fanout, mq, dlq_queue_name));

    if reconcile_enabled {
        tokio::spawn(run_reconciliation_sweep(state.clone()));
    } else {
        info!("Reconciliation sweep disabled");
    }

    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("Swagger UI: http://{}/swagger-ui", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
