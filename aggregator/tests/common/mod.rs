#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aggregator::server::AggregatorServer;
use aggregator::service::Aggregator;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toll_common::shutdown::{ListenerState, ServeError};

pub struct TestServer {
    pub http_addr: SocketAddr,
    pub grpc_addr: SocketAddr,
    pub http_state: watch::Receiver<ListenerState>,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<Result<(), ServeError>>,
}

impl TestServer {
    pub async fn start(aggregator: Arc<dyn Aggregator>, drain_timeout: Duration) -> Self {
        let server = AggregatorServer::bind("127.0.0.1:0", "127.0.0.1:0", aggregator, drain_timeout)
            .await
            .expect("failed to bind");
        let http_addr = server.http_addr().unwrap();
        let grpc_addr = server.grpc_addr().unwrap();
        let http_state = server.http_state();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));

        Self {
            http_addr,
            grpc_addr,
            http_state,
            shutdown,
            handle,
        }
    }

    pub fn http_endpoint(&self) -> String {
        format!("http://{}", self.http_addr)
    }

    pub fn grpc_endpoint(&self) -> String {
        format!("http://{}", self.grpc_addr)
    }
}
