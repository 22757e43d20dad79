//! Client side of the aggregator, over either of its transports.
//!
//! Callers hold an `Arc<dyn AggregatorClient>` and do not know which transport
//! is behind it. Failures keep the same taxonomy on both transports: the
//! aggregator could not be reached or answered with an unexpected status
//! ([`ClientError::is_transport`]), the request was refused as invalid, the
//! identity has no data, or the response could not be decoded.

mod grpc;
mod http;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use toll_common::middleware::Fault;
use toll_common::types::{DistanceSample, Invoice};

pub use self::grpc::GrpcClient;
pub use self::http::HttpClient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("failed to reach aggregator: {0}")]
    Transport(String),
    #[error("aggregator answered {status}: {message}")]
    Status { status: String, message: String },
    #[error("aggregator rejected the request: {0}")]
    Rejected(String),
    #[error("no data for obu {0}")]
    NotFound(i64),
    #[error("failed to decode aggregator response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Status { .. })
    }
}

impl Fault for ClientError {
    fn is_fault(&self) -> bool {
        !matches!(self, ClientError::NotFound(_) | ClientError::Rejected(_))
    }
}

#[async_trait]
pub trait AggregatorClient: Send + Sync {
    async fn aggregate(&self, sample: &DistanceSample) -> Result<(), ClientError>;
    async fn invoice(&self, obu_id: i64) -> Result<Invoice, ClientError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientTransport {
    Http,
    Grpc,
}

impl FromStr for ClientTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ClientTransport::Http),
            "grpc" => Ok(ClientTransport::Grpc),
            other => Err(format!("unknown aggregator transport {other:?}")),
        }
    }
}

/// Build a client for `transport`. The gRPC channel connects lazily, so an
/// unreachable aggregator only surfaces on the first call.
pub fn build_client(
    transport: ClientTransport,
    http_endpoint: &str,
    grpc_endpoint: &str,
    timeout: Duration,
) -> Result<Arc<dyn AggregatorClient>, ClientError> {
    Ok(match transport {
        ClientTransport::Http => Arc::new(HttpClient::new(http_endpoint, timeout)?),
        ClientTransport::Grpc => Arc::new(GrpcClient::new(grpc_endpoint, timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport() {
        assert_eq!("http".parse(), Ok(ClientTransport::Http));
        assert_eq!(" GRPC ".parse(), Ok(ClientTransport::Grpc));
        assert!("carrier-pigeon".parse::<ClientTransport>().is_err());
    }

    #[test]
    fn error_kinds() {
        assert!(ClientError::Transport("refused".to_owned()).is_transport());
        assert!(ClientError::Status {
            status: "500".to_owned(),
            message: "boom".to_owned()
        }
        .is_transport());
        assert!(!ClientError::NotFound(1).is_transport());
        assert!(!ClientError::Decode("eof".to_owned()).is_transport());
        assert!(!ClientError::Rejected("bad".to_owned()).is_transport());
    }

    #[tokio::test]
    async fn invalid_grpc_endpoint_fails_at_construction() {
        let result = build_client(
            ClientTransport::Grpc,
            "http://127.0.0.1:1",
            "not a uri",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
