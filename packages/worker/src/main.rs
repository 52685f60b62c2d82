use std::sync::Arc;

use anyhow::Context;
use common::worker::Task;
use mq::{BrokerMessage, JobQueue};
use tracing::{error, info};
use worker::bootstrap::{build_orchestrator, connect_mq};
use worker::config::WorkerAppConfig;
use worker::handle_generation_task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let mq = connect_mq(&config)
        .await
        .context("Failed to initialize MQ")?;

    info!(
        queue_name = %config.mq.queue_name,
        dlq_queue_name = %config.mq.dlq_queue_name,
        max_attempts = config.generation.max_attempts,
        concurrency = config.generation.concurrency,
        "MQ connected"
    );

    let queue: Arc<dyn JobQueue> = mq.clone();
    let orchestrator = Arc::new(
        build_orchestrator(&config, queue)
            .await
            .context("Failed to build generation pipeline")?,
    );

    let result = mq
        .process_messages(
            &config.mq.queue_name,
            Some(config.generation.concurrency),
            None,
            move |message: BrokerMessage<Task>| {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    if let Some(outcome) =
                        handle_generation_task(message.payload, &orchestrator).await
                    {
                        info!(?outcome, "Job finished");
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}
