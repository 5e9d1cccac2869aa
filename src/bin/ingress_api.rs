use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use student_relay::{
    AppError, AppResult, AppState, Config, KafkaPublisher, PgStudentStore, build_router, metrics,
    utils,
};

#[tokio::main]
async fn main() -> ExitCode {
    utils::init_tracing();

    info!("Starting Ingress API v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Ingress API failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<()> {
    let config = Config::from_env()?;
    info!(
        host = %config.host,
        port = config.port,
        broker = %config.kafka_broker,
        topic = %config.kafka_topic,
        log_level = %config.log_level,
        "Configuration loaded"
    );

    metrics::try_init_metrics(config.metrics_addr());

    let publisher = Arc::new(KafkaPublisher::new(&config)?);
    let store = Arc::new(PgStudentStore::connect_lazy(&config)?);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid server address: {e}")))?;

    let state = AppState::new(publisher, store, config);
    let app = build_router(state.clone());

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Unavailable(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{addr}");
    info!("  GET  /health   - Readiness check");
    info!("  POST /students - Submit a registration");
    info!("  GET  /students - List registrations");

    let stop_serving = CancellationToken::new();
    let server = {
        let stop = stop_serving.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        })
    };

    // The broker connects while requests are already being answered with 503.
    let outcome = tokio::select! {
        biased;

        _ = utils::shutdown_signal() => Ok(()),
        connected = state.connect_broker() => match connected {
            Ok(()) => {
                utils::shutdown_signal().await;
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    state.connection.mark_closed();
    stop_serving.cancel();

    match server.await {
        Ok(Ok(())) => info!("HTTP server stopped"),
        Ok(Err(e)) => error!(error = %e, "Server error"),
        Err(e) => error!(error = %e, "Server task failed"),
    }

    state.shutdown().await;
    outcome
}
