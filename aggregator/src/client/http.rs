use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use toll_common::types::{DistanceSample, Invoice};

use super::{AggregatorClient, ClientError};

pub struct HttpClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl AggregatorClient for HttpClient {
    async fn aggregate(&self, sample: &DistanceSample) -> Result<(), ClientError> {
        let response = self
            .client
            .post(format!("{}/aggregate", self.endpoint))
            .json(sample)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            // Accepting a sample has no domain miss: a 404 is a wrong route.
            Err(status_error(response, None).await)
        }
    }

    async fn invoice(&self, obu_id: i64) -> Result<Invoice, ClientError> {
        let response = self
            .client
            .get(format!("{}/invoice", self.endpoint))
            .query(&[("id", obu_id)])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response, Some(obu_id)).await);
        }

        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}

// Error bodies are `{"error": "..."}`, anything else is passed on verbatim.
// A 404 is a lookup miss only for lookups, and only when the body has that
// shape; a bare 404 comes from a route the endpoint does not serve.
async fn status_error(response: Response, lookup: Option<i64>) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let error = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned));

    match (status, lookup, error) {
        (StatusCode::NOT_FOUND, Some(obu_id), Some(_)) => ClientError::NotFound(obu_id),
        (StatusCode::BAD_REQUEST, _, error) => ClientError::Rejected(error.unwrap_or(body)),
        (status, _, error) => ClientError::Status {
            status: status.as_u16().to_string(),
            message: error.unwrap_or(body),
        },
    }
}
