pub mod calculator;
pub mod config;
pub mod consumer;
pub mod middleware;
pub mod source;
