use anyhow::Context;
use axum::Router;
use envconfig::Envconfig;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use aggregator::client::build_client;
use invoice_gateway::config::Config;
use invoice_gateway::handlers::add_routes;
use toll_common::metrics::setup_metrics_recorder;
use toll_common::shutdown::{cancel_on_signal, Listener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_layer = fmt::layer().with_target(true).with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();

    let config = Config::init_from_env().context("invalid gateway configuration")?;

    let client = build_client(
        config.aggregator_transport,
        &config.aggregator_http_endpoint,
        &config.aggregator_grpc_endpoint,
        config.client_timeout.0,
    )
    .context("failed to create aggregator client")?;

    let recorder_handle = config.export_prometheus.then(setup_metrics_recorder);
    let app = add_routes(Router::new(), client, recorder_handle);

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .context("failed to bind gateway listener")?;
    tracing::info!(address = %config.address, "starting invoice gateway");

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let server_shutdown = shutdown.clone().cancelled_owned();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown)
            .await
    };

    Listener::new("http")
        .supervise(server, shutdown, config.drain_timeout.0)
        .await?;
    Ok(())
}
