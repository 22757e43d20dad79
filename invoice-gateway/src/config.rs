use aggregator::client::ClientTransport;
use envconfig::Envconfig;
use toll_common::config::EnvMsDuration;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "GATEWAY_ADDRESS", default = "0.0.0.0:8000")]
    pub address: String,

    #[envconfig(from = "AGGREGATOR_TRANSPORT", default = "http")]
    pub aggregator_transport: ClientTransport,

    #[envconfig(from = "AGGREGATOR_HTTP_ENDPOINT", default = "http://127.0.0.1:3000")]
    pub aggregator_http_endpoint: String,

    #[envconfig(from = "AGGREGATOR_GRPC_ENDPOINT", default = "http://127.0.0.1:3001")]
    pub aggregator_grpc_endpoint: String,

    #[envconfig(from = "CLIENT_TIMEOUT_MS", default = "5000")]
    pub client_timeout: EnvMsDuration,

    #[envconfig(from = "DRAIN_TIMEOUT_MS", default = "5000")]
    pub drain_timeout: EnvMsDuration,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "true")]
    pub export_prometheus: bool,
}
