pub mod client;
pub mod config;
pub mod grpc;
pub mod http;
pub mod middleware;
pub mod proto;
pub mod server;
pub mod service;
pub mod store;
