use guidance_worker::config::WorkerConfig;
use guidance_worker::domain::{GuidanceLoop, GuidanceSettings};

use common::{
    init_telemetry, AnalyticsSink, KafkaRecordStream, NoopAnalytics, PostgresClient,
    PostgresMeterWriter, PosthogAnalytics, TelemetryConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const WRITER_POOL_SIZE: usize = 2;

#[tokio::main]
async fn main() {
    let config = match WorkerConfig::from_env() {
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

    info!(
        consumer_group = %config.kafka_consumer_group,
        topic = %config.events_topic,
        "Starting guidance worker"
    );

    let guidance = match build_loop(&config).await {
        Ok(guidance) => guidance,
        Err(e) => {
            error!("Failed to initialize dependencies: {:#}", e);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone());

    // A persistence invariant break must crash the process: the orchestrator
    // restarts it and the uncommitted offsets replay.
    if let Err(e) = guidance.run(shutdown).await {
        error!("Guidance loop failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Guidance worker exiting");
}

async fn build_loop(config: &WorkerConfig) -> anyhow::Result<GuidanceLoop> {
    info!("Initializing PostgreSQL...");
    let postgres_client = PostgresClient::new(&config.database_url(), WRITER_POOL_SIZE)?;
    postgres_client.ping().await?;
    let writer = PostgresMeterWriter::new(postgres_client);

    info!("Initializing Kafka consumer...");
    let stream = KafkaRecordStream::connect(&config.kafka_settings(), &config.kafka_consumer_group)?;

    let analytics: Arc<dyn AnalyticsSink> = if config.posthog_api_key.is_empty() {
        info!("No posthog key found, skipping posthog events");
        Arc::new(NoopAnalytics)
    } else {
        Arc::new(PosthogAnalytics::new(config.posthog_api_key.clone()))
    };

    Ok(GuidanceLoop::new(
        Box::new(stream),
        Arc::new(writer),
        analytics,
        GuidanceSettings {
            batch_size: config.batch_size,
            fetch_max_records: config.fetch_max_records,
            fetch_max_wait: Duration::from_secs(config.fetch_max_wait_secs),
        },
    ))
}

fn spawn_signal_handlers(shutdown: CancellationToken) {
    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                error!("Error setting up signal handler: {}", err);
            }
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM signal");
                    shutdown.cancel();
                }
                Err(err) => {
                    error!("Error setting up SIGTERM handler: {}", err);
                }
            }
        });
    }
}
