use anyhow::Context;
use envconfig::Envconfig;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use aggregator::config::{Config, StoreType};
use aggregator::middleware::instrument;
use aggregator::server::AggregatorServer;
use aggregator::service::InvoiceAggregator;
use aggregator::store::MemoryStore;
use toll_common::metrics::setup_metrics_recorder;
use toll_common::shutdown::cancel_on_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_layer = fmt::layer().with_target(true).with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();

    let config = Config::init_from_env().context("invalid aggregator configuration")?;

    let aggregator = match config.store_type {
        StoreType::Memory => instrument(InvoiceAggregator::new(MemoryStore::new())),
    };

    let mut server = AggregatorServer::bind(
        &config.http_address,
        &config.grpc_address,
        aggregator,
        config.drain_timeout.0,
    )
    .await
    .context("failed to bind aggregator listeners")?;

    if config.export_prometheus {
        server = server.with_recorder(setup_metrics_recorder());
    }

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    server.run(shutdown).await?;
    Ok(())
}
