use std::str::FromStr;

use envconfig::Envconfig;
use toll_common::config::EnvMsDuration;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "AGG_HTTP_ADDRESS", default = "127.0.0.1:3000")]
    pub http_address: String,

    #[envconfig(from = "AGG_GRPC_ADDRESS", default = "127.0.0.1:3001")]
    pub grpc_address: String,

    #[envconfig(from = "AGG_STORE_TYPE", default = "memory")]
    pub store_type: StoreType,

    #[envconfig(from = "AGG_DRAIN_TIMEOUT_MS", default = "10000")]
    pub drain_timeout: EnvMsDuration,

    #[envconfig(from = "AGG_EXPORT_PROMETHEUS", default = "true")]
    pub export_prometheus: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreType {
    Memory,
}

impl FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            other => Err(format!("unknown store type {other:?}")),
        }
    }
}
