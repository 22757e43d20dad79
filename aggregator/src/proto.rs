//! Binary protocol of the aggregator: prost messages and the generated
//! `AggregatorService` client and server (see `build.rs`).

use toll_common::types::{DistanceSample, Invoice};

#[derive(Clone, PartialEq, prost::Message)]
pub struct AggregateRequest {
    #[prost(int64, tag = "1")]
    pub obu_id: i64,
    #[prost(double, tag = "2")]
    pub value: f64,
    #[prost(int64, tag = "3")]
    pub unix: i64,
    #[prost(string, tag = "4")]
    pub request_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Ack {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InvoiceRequest {
    #[prost(int64, tag = "1")]
    pub obu_id: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InvoiceReply {
    #[prost(int64, tag = "1")]
    pub obu_id: i64,
    #[prost(double, tag = "2")]
    pub total_distance: f64,
    #[prost(double, tag = "3")]
    pub total_amount: f64,
}

include!(concat!(env!("OUT_DIR"), "/toll.aggregator.v1.AggregatorService.rs"));

impl From<&DistanceSample> for AggregateRequest {
    fn from(sample: &DistanceSample) -> Self {
        Self {
            obu_id: sample.obu_id,
            value: sample.value,
            unix: sample.unix,
            request_id: sample.request_id.clone().unwrap_or_default(),
        }
    }
}

impl From<AggregateRequest> for DistanceSample {
    fn from(req: AggregateRequest) -> Self {
        let request_id = Some(req.request_id).filter(|id| !id.is_empty());
        DistanceSample::new(req.obu_id, req.value, req.unix, request_id)
    }
}

impl From<Invoice> for InvoiceReply {
    fn from(invoice: Invoice) -> Self {
        Self {
            obu_id: invoice.obu_id,
            total_distance: invoice.total_distance,
            total_amount: invoice.total_amount,
        }
    }
}

impl From<InvoiceReply> for Invoice {
    fn from(reply: InvoiceReply) -> Self {
        Self {
            obu_id: reply.obu_id,
            total_distance: reply.total_distance,
            total_amount: reply.total_amount,
        }
    }
}
