use ingest_api::config::ServiceConfig;
use ingest_api::domain::{ApiKeyAuthenticator, TrackEventsService};
use ingest_api::http::{app, AppState};

use common::{
    init_telemetry, KafkaEventProducer, PostgresApiKeyStore, PostgresClient, RedisIdentityCache,
    TelemetryConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

const AUTH_POOL_SIZE: usize = 10;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(port = config.port, "Starting ingest-api service");

    let state = match build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize dependencies: {:#}", e);
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, "Failed to bind listener: {}", e);
            std::process::exit(1);
        }
    };

    info!(%addr, "Listening for track requests");

    if let Err(e) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Ingest-api exiting");
}

async fn build_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    info!("Initializing PostgreSQL...");
    let postgres_client = PostgresClient::new(&config.database_url(), AUTH_POOL_SIZE)?;
    postgres_client.ping().await?;

    info!("Initializing identity cache...");
    let redis_url = config
        .redis_url()
        .ok_or_else(|| anyhow::anyhow!("redis url is empty"))?;
    let cache = RedisIdentityCache::connect(redis_url).await?;

    info!("Initializing Kafka producer...");
    let producer = KafkaEventProducer::new(&config.kafka_settings())?;

    let authenticator = Arc::new(ApiKeyAuthenticator::new(
        Arc::new(PostgresApiKeyStore::new(postgres_client)),
        Arc::new(cache),
    ));
    let tracker = Arc::new(TrackEventsService::new(Arc::new(producer)));

    Ok(AppState::new(authenticator, tracker))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error setting up signal handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => error!("Error setting up SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received shutdown signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
