use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::proto::aggregator_service_server::{AggregatorService, AggregatorServiceServer};
use crate::proto::{Ack, AggregateRequest, InvoiceReply, InvoiceRequest};
use crate::service::{Aggregator, AggregatorError};

impl From<AggregatorError> for Status {
    fn from(err: AggregatorError) -> Self {
        match err {
            AggregatorError::InvalidSample { .. } => Status::invalid_argument(err.to_string()),
            AggregatorError::NoData(_) => Status::not_found(err.to_string()),
            AggregatorError::Store(_) => Status::internal(err.to_string()),
        }
    }
}

/// Binary front-end of the aggregator, sharing the service instance of the HTTP one.
pub struct GrpcAggregator {
    aggregator: Arc<dyn Aggregator>,
}

impl GrpcAggregator {
    pub fn new(aggregator: Arc<dyn Aggregator>) -> Self {
        Self { aggregator }
    }

    pub fn into_service(self) -> AggregatorServiceServer<Self> {
        AggregatorServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl AggregatorService for GrpcAggregator {
    async fn aggregate(&self, request: Request<AggregateRequest>) -> Result<Response<Ack>, Status> {
        self.aggregator
            .aggregate_distance(request.into_inner().into())
            .await?;

        Ok(Response::new(Ack {}))
    }

    async fn get_invoice(
        &self,
        request: Request<InvoiceRequest>,
    ) -> Result<Response<InvoiceReply>, Status> {
        let invoice = self
            .aggregator
            .calculate_invoice(request.into_inner().obu_id)
            .await?;

        Ok(Response::new(invoice.into()))
    }
}
