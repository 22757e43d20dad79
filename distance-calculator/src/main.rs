use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use envconfig::Envconfig;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use aggregator::client::build_client;
use distance_calculator::calculator::DistanceCalculator;
use distance_calculator::config::Config;
use distance_calculator::consumer::Consumer;
use distance_calculator::middleware::instrument;
use distance_calculator::source::KafkaSource;
use toll_common::metrics::{setup_metrics_recorder, setup_metrics_routes};
use toll_common::shutdown::{cancel_on_signal, Listener};
use toll_common::time::SystemTime;

async fn index() -> &'static str {
    "distance calculator"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_layer = fmt::layer().with_target(true).with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();

    let config = Config::init_from_env().context("invalid distance calculator configuration")?;

    let recorder_handle = config.export_prometheus.then(setup_metrics_recorder);
    let router = setup_metrics_routes(Router::new().route("/", get(index)), recorder_handle);
    let listener = tokio::net::TcpListener::bind(config.bind())
        .await
        .context("failed to bind metrics listener")?;

    let source = KafkaSource::new(&config.kafka).context("failed to create kafka consumer")?;
    let client = build_client(
        config.aggregator_transport,
        &config.aggregator_http_endpoint,
        &config.aggregator_grpc_endpoint,
        config.client_timeout.0,
    )
    .context("failed to create aggregator client")?;
    let consumer = Consumer::new(
        Arc::new(source),
        instrument(DistanceCalculator),
        client,
        SystemTime {},
    );

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let metrics_shutdown = shutdown.clone().cancelled_owned();
    let metrics_server = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(metrics_shutdown)
            .await
    };

    let (metrics, consumer) = tokio::join!(
        Listener::new("metrics").supervise(metrics_server, shutdown.clone(), config.drain_timeout.0),
        Listener::new("consumer").supervise(
            consumer.run(shutdown.clone()),
            shutdown.clone(),
            config.drain_timeout.0
        ),
    );

    metrics.and(consumer)?;
    Ok(())
}
