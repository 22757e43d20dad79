use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use toll_common::shutdown::{Listener, ListenerState, ServeError};
use tracing::info;

use crate::grpc::GrpcAggregator;
use crate::service::Aggregator;

/// Both front-ends of one aggregator. They share the service instance and the
/// shutdown token: whichever way shutdown starts, both listeners drain.
pub struct AggregatorServer {
    http: TcpListener,
    grpc: TcpListener,
    http_listener: Listener,
    grpc_listener: Listener,
    aggregator: Arc<dyn Aggregator>,
    recorder_handle: Option<PrometheusHandle>,
    drain_timeout: Duration,
}

impl AggregatorServer {
    pub async fn bind(
        http_address: &str,
        grpc_address: &str,
        aggregator: Arc<dyn Aggregator>,
        drain_timeout: Duration,
    ) -> std::io::Result<Self> {
        let http = TcpListener::bind(http_address).await?;
        let grpc = TcpListener::bind(grpc_address).await?;

        Ok(Self {
            http,
            grpc,
            http_listener: Listener::new("http"),
            grpc_listener: Listener::new("grpc"),
            aggregator,
            recorder_handle: None,
            drain_timeout,
        })
    }

    pub fn with_recorder(mut self, recorder_handle: PrometheusHandle) -> Self {
        self.recorder_handle = Some(recorder_handle);
        self
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    pub fn grpc_addr(&self) -> std::io::Result<SocketAddr> {
        self.grpc.local_addr()
    }

    pub fn http_state(&self) -> watch::Receiver<ListenerState> {
        self.http_listener.subscribe()
    }

    pub fn grpc_state(&self) -> watch::Receiver<ListenerState> {
        self.grpc_listener.subscribe()
    }

    /// Serve until `shutdown` is cancelled or one of the listeners fails, then
    /// drain both. Returns the first listener error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServeError> {
        info!(
            http = ?self.http.local_addr().ok(),
            grpc = ?self.grpc.local_addr().ok(),
            "starting aggregator"
        );

        let router = crate::http::router(self.aggregator.clone(), self.recorder_handle);
        let http_shutdown = shutdown.clone().cancelled_owned();
        let http_server = async move {
            axum::serve(self.http, router)
                .with_graceful_shutdown(http_shutdown)
                .await
        };

        let grpc_server = tonic::transport::Server::builder()
            .add_service(GrpcAggregator::new(self.aggregator).into_service())
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(self.grpc),
                shutdown.clone().cancelled_owned(),
            );

        let (http, grpc) = tokio::join!(
            self.http_listener
                .supervise(http_server, shutdown.clone(), self.drain_timeout),
            self.grpc_listener
                .supervise(grpc_server, shutdown.clone(), self.drain_timeout),
        );

        http.and(grpc)
    }
}
