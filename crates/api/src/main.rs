use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use roomcraft_gateway::{GatewayConfig, HttpModelGateway};
use roomcraft_pipeline::{PgProjectStore, PipelineOrchestrator, RetryPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomcraft_api::config::{LogFormat, ServerConfig};
use roomcraft_api::router::build_app_router;
use roomcraft_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let gateway_config = GatewayConfig::from_env();
    let retry = RetryPolicy::from_env();
    let run_budget = PipelineOrchestrator::worst_case_run(&retry, gateway_config.call_timeout);
    let config = ServerConfig::from_env(run_budget);

    // --- Tracing ---
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roomcraft_api=debug,roomcraft_pipeline=debug,roomcraft_gateway=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!(
        host = %config.host,
        port = %config.port,
        request_timeout_secs = config.request_timeout_secs,
        "Loaded server configuration",
    );
    if Duration::from_secs(config.request_timeout_secs) < run_budget {
        tracing::warn!(
            request_timeout_secs = config.request_timeout_secs,
            run_budget_secs = run_budget.as_secs(),
            "REQUEST_TIMEOUT_SECS is shorter than the worst-case pipeline run",
        );
    }

    // --- Database ---
    let pool = roomcraft_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    roomcraft_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    roomcraft_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Model gateway ---
    let image_options = gateway_config.image_options.clone();
    tracing::info!(
        vision_model = %gateway_config.vision.model,
        text_model = %gateway_config.text.model,
        image_model = %gateway_config.image_model_version,
        "Loaded model gateway configuration",
    );
    let gateway = HttpModelGateway::new(gateway_config).expect("Failed to build model gateway");

    // --- Pipeline ---
    tracing::info!(
        max_retries = retry.max_retries,
        base_delay_ms = retry.base_delay.as_millis() as u64,
        "Loaded provider retry policy",
    );
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(gateway),
        Arc::new(PgProjectStore::new(pool.clone())),
        retry,
        image_options,
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator: Arc::new(orchestrator),
    };

    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let cleanup = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(cleanup, pool.close()).await.is_err() {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Database pool did not close in time"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
