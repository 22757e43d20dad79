// The message types are plain prost structs in `src/proto.rs`; only the
// service plumbing is generated here, so no protoc is needed at build time.
fn main() {
    let method = |name: &str, route: &str, input: &str, output: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route)
            .input_type(input)
            .output_type(output)
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let aggregator_service = tonic_build::manual::Service::builder()
        .name("AggregatorService")
        .package("toll.aggregator.v1")
        .method(method(
            "aggregate",
            "Aggregate",
            "crate::proto::AggregateRequest",
            "crate::proto::Ack",
        ))
        .method(method(
            "get_invoice",
            "GetInvoice",
            "crate::proto::InvoiceRequest",
            "crate::proto::InvoiceReply",
        ))
        .build();

    tonic_build::manual::Builder::new().compile(&[aggregator_service]);
}
