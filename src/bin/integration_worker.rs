use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use student_relay::config::WORKER_METRICS_PORT;
use student_relay::{AppResult, Config, IntegrationWorker, PgStudentStore, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    utils::init_tracing();

    info!("Starting Integration Worker v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Integration worker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<()> {
    let config = Arc::new(Config::from_env_with_metrics_port(WORKER_METRICS_PORT)?);
    info!(
        broker = %config.kafka_broker,
        topic = %config.kafka_topic,
        attempts = config.startup_max_attempts,
        delay_secs = config.startup_retry_delay.as_secs(),
        "Configuration loaded"
    );

    metrics::try_init_metrics(config.metrics_addr());

    let store = Arc::new(PgStudentStore::connect_lazy(&config)?);
    let mut worker = IntegrationWorker::new(config, store);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        utils::shutdown_signal().await;
        on_signal.cancel();
    });

    let startup = tokio::select! {
        biased;

        _ = cancel.cancelled() => None,
        subscriber = async {
            worker.prepare_store().await?;
            worker.connect_broker().await
        } => Some(subscriber),
    };

    let Some(subscriber) = startup else {
        info!("Shutdown requested during startup");
        worker.shutdown(None).await;
        return Ok(());
    };
    let subscriber = subscriber?;

    worker.run(&subscriber, cancel).await;
    worker.shutdown(Some(&subscriber)).await;

    Ok(())
}
