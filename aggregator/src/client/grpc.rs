use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use toll_common::types::{DistanceSample, Invoice};

use super::{AggregatorClient, ClientError};
use crate::proto::aggregator_service_client::AggregatorServiceClient;
use crate::proto::{AggregateRequest, InvoiceRequest};

pub struct GrpcClient {
    client: AggregatorServiceClient<Channel>,
}

impl GrpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let channel = Endpoint::from_shared(endpoint.to_owned())
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();

        Ok(Self {
            client: AggregatorServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl AggregatorClient for GrpcClient {
    async fn aggregate(&self, sample: &DistanceSample) -> Result<(), ClientError> {
        // Channels are cheap to clone and multiplex calls.
        self.client
            .clone()
            .aggregate(AggregateRequest::from(sample))
            .await
            .map_err(|status| status_error(status, sample.obu_id))?;

        Ok(())
    }

    async fn invoice(&self, obu_id: i64) -> Result<Invoice, ClientError> {
        let reply = self
            .client
            .clone()
            .get_invoice(InvoiceRequest { obu_id })
            .await
            .map_err(|status| status_error(status, obu_id))?;

        Ok(reply.into_inner().into())
    }
}

fn status_error(status: Status, obu_id: i64) -> ClientError {
    match status.code() {
        Code::NotFound => ClientError::NotFound(obu_id),
        Code::InvalidArgument => ClientError::Rejected(status.message().to_owned()),
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            ClientError::Transport(status.to_string())
        }
        // Raised by the codec when a reply does not decode.
        Code::Internal if status.message().starts_with("failed to decode") => {
            ClientError::Decode(status.message().to_owned())
        }
        code => ClientError::Status {
            status: format!("{code:?}"),
            message: status.message().to_owned(),
        },
    }
}
