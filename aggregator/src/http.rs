use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use toll_common::metrics::setup_metrics_routes;
use toll_common::types::{parse_obu_id, DistanceSample, Invoice};
use tower_http::trace::TraceLayer;

use crate::service::{Aggregator, AggregatorError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("failed to decode distance sample: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing or invalid obu id")]
    InvalidId,
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Decode(_)
            | ApiError::InvalidId
            | ApiError::Aggregator(AggregatorError::InvalidSample { .. }) => StatusCode::BAD_REQUEST,

            ApiError::Aggregator(AggregatorError::NoData(_)) => StatusCode::NOT_FOUND,

            ApiError::Aggregator(AggregatorError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    aggregator: Arc<dyn Aggregator>,
}

#[derive(Deserialize)]
struct InvoiceQuery {
    id: Option<String>,
}

pub fn router(aggregator: Arc<dyn Aggregator>, recorder_handle: Option<PrometheusHandle>) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/aggregate", post(aggregate))
        .route("/invoice", get(invoice))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { aggregator });

    setup_metrics_routes(router, recorder_handle)
}

async fn index() -> &'static str {
    "aggregator"
}

// The body is decoded by hand so that a malformed payload is answered with the
// same JSON error shape as every other failure.
async fn aggregate(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let sample: DistanceSample = serde_json::from_slice(&body)?;
    state.aggregator.aggregate_distance(sample).await?;

    Ok(Json(json!({})))
}

async fn invoice(
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Invoice>, ApiError> {
    let obu_id = query
        .id
        .as_deref()
        .and_then(parse_obu_id)
        .ok_or(ApiError::InvalidId)?;

    let invoice = state.aggregator.calculate_invoice(obu_id).await?;
    Ok(Json(invoice))
}
