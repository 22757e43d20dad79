use std::sync::Arc;
use std::time::Duration;

use aggregator::client::{build_client, ClientTransport};
use aggregator::server::AggregatorServer;
use aggregator::service::{Aggregator, AggregatorError, InvoiceAggregator};
use aggregator::store::MemoryStore;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use toll_common::shutdown::ListenerState;
use toll_common::types::{DistanceSample, Invoice};

mod common;
use common::TestServer;

/// Holds every aggregate call for `delay`, signalling when one has started.
struct Slow {
    inner: InvoiceAggregator<MemoryStore>,
    started: Arc<Notify>,
    delay: Duration,
}

#[async_trait]
impl Aggregator for Slow {
    async fn aggregate_distance(&self, sample: DistanceSample) -> Result<(), AggregatorError> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.aggregate_distance(sample).await
    }

    async fn calculate_invoice(&self, obu_id: i64) -> Result<Invoice, AggregatorError> {
        self.inner.calculate_invoice(obu_id).await
    }
}

#[tokio::test]
async fn in_flight_requests_finish_and_new_ones_are_refused() {
    let started = Arc::new(Notify::new());
    let slow = Slow {
        inner: InvoiceAggregator::new(MemoryStore::new()),
        started: started.clone(),
        delay: Duration::from_millis(300),
    };
    let drain_timeout = Duration::from_secs(5);
    let server = TestServer::start(Arc::new(slow), drain_timeout).await;
    let endpoint = server.http_endpoint();

    let client = build_client(
        ClientTransport::Http,
        &endpoint,
        &server.grpc_endpoint(),
        Duration::from_secs(5),
    )
    .unwrap();
    let in_flight = tokio::spawn(async move {
        client
            .aggregate(&DistanceSample::new(1, 2.0, 1, None))
            .await
    });

    started.notified().await;
    let cancelled_at = Instant::now();
    server.shutdown.cancel();

    in_flight
        .await
        .unwrap()
        .expect("in-flight request completes while draining");

    tokio::time::timeout(drain_timeout + Duration::from_secs(1), server.handle)
        .await
        .expect("server stops within the drain timeout")
        .unwrap()
        .expect("clean shutdown");
    assert!(cancelled_at.elapsed() < drain_timeout);

    // Both listeners are closed once `run` returns.
    for transport in [ClientTransport::Http, ClientTransport::Grpc] {
        let client = build_client(
            transport,
            &endpoint,
            &format!("http://{}", server.grpc_addr),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.invoice(1).await.unwrap_err();
        assert!(err.is_transport(), "{transport:?}: {err}");
    }
}

#[tokio::test]
async fn stuck_requests_do_not_hold_shutdown_past_the_timeout() {
    let started = Arc::new(Notify::new());
    let slow = Slow {
        inner: InvoiceAggregator::new(MemoryStore::new()),
        started: started.clone(),
        delay: Duration::from_secs(60),
    };
    let drain_timeout = Duration::from_millis(200);
    let server = TestServer::start(Arc::new(slow), drain_timeout).await;

    let client = build_client(
        ClientTransport::Grpc,
        &server.http_endpoint(),
        &server.grpc_endpoint(),
        Duration::from_secs(60),
    )
    .unwrap();
    let stuck = tokio::spawn(async move {
        client
            .aggregate(&DistanceSample::new(1, 2.0, 1, None))
            .await
    });

    started.notified().await;
    let cancelled_at = Instant::now();
    server.shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("forced close after the drain timeout")
        .unwrap()
        .expect("timeout is not an error");
    assert!(cancelled_at.elapsed() >= drain_timeout);
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));

    stuck.abort();
}

#[tokio::test]
async fn draining_listener_refuses_new_connections() {
    let started = Arc::new(Notify::new());
    let slow = Slow {
        inner: InvoiceAggregator::new(MemoryStore::new()),
        started: started.clone(),
        delay: Duration::from_secs(2),
    };
    let mut server = TestServer::start(Arc::new(slow), Duration::from_secs(10)).await;
    server
        .http_state
        .wait_for(|s| *s == ListenerState::Serving)
        .await
        .unwrap();

    let client = build_client(
        ClientTransport::Http,
        &server.http_endpoint(),
        &server.grpc_endpoint(),
        Duration::from_secs(10),
    )
    .unwrap();
    let in_flight = tokio::spawn(async move {
        client
            .aggregate(&DistanceSample::new(1, 2.0, 1, None))
            .await
    });

    started.notified().await;
    server.shutdown.cancel();
    server
        .http_state
        .wait_for(|s| *s == ListenerState::Draining)
        .await
        .unwrap();

    // The accept loop stops shortly after the state flips; a connection that
    // slipped into the backlog before that is not an error.
    let refused = tokio::time::timeout(Duration::from_secs(1), async {
        while TcpStream::connect(server.http_addr).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(refused.is_ok(), "draining listener still accepts connections");
    assert!(!in_flight.is_finished());
    assert_eq!(*server.http_state.borrow(), ListenerState::Draining);

    in_flight
        .await
        .unwrap()
        .expect("in-flight request completes while draining");
    server.handle.await.unwrap().expect("clean shutdown");
    assert_eq!(*server.http_state.borrow(), ListenerState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn requested_shutdown_is_always_clean() {
    for _ in 0..50 {
        let server = AggregatorServer::bind(
            "127.0.0.1:0",
            "127.0.0.1:0",
            Arc::new(InvoiceAggregator::new(MemoryStore::new())),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));

        tokio::task::yield_now().await;
        shutdown.cancel();
        handle.await.unwrap().expect("requested shutdown is clean");
    }
}
