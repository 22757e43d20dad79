use aggregator::client::ClientTransport;
use envconfig::Envconfig;
use toll_common::config::EnvMsDuration;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3302")]
    pub port: u16,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(from = "AGGREGATOR_TRANSPORT", default = "grpc")]
    pub aggregator_transport: ClientTransport,

    #[envconfig(from = "AGGREGATOR_HTTP_ENDPOINT", default = "http://127.0.0.1:3000")]
    pub aggregator_http_endpoint: String,

    #[envconfig(from = "AGGREGATOR_GRPC_ENDPOINT", default = "http://127.0.0.1:3001")]
    pub aggregator_grpc_endpoint: String,

    #[envconfig(from = "CLIENT_TIMEOUT_MS", default = "5000")]
    pub client_timeout: EnvMsDuration,

    #[envconfig(from = "DRAIN_TIMEOUT_MS", default = "10000")]
    pub drain_timeout: EnvMsDuration,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "true")]
    pub export_prometheus: bool,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    #[envconfig(default = "obudata")]
    pub kafka_topic: String,

    #[envconfig(default = "distance-calculator")]
    pub kafka_consumer_group: String,

    // earliest, latest
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String,

    #[envconfig(default = "false")]
    pub kafka_tls: bool,
}
