use std::sync::Arc;

use aggregator::client::{AggregatorClient, ClientError};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use toll_common::metrics::setup_metrics_routes;
use toll_common::types::{parse_obu_id, Invoice};
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("missing or incorrect 'id' query parameter")]
    InvalidId,
    #[error("no data for obu {0}")]
    NotFound(i64),
    #[error("failed to fetch invoice data")]
    Upstream(ClientError),
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(obu_id) => GatewayError::NotFound(obu_id),
            err => {
                error!("failed to fetch invoice: {}", err);
                GatewayError::Upstream(err)
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match self {
            GatewayError::InvalidId => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    client: Arc<dyn AggregatorClient>,
}

#[derive(Deserialize)]
struct InvoiceQuery {
    id: Option<String>,
}

pub fn add_routes(
    router: Router,
    client: Arc<dyn AggregatorClient>,
    recorder_handle: Option<PrometheusHandle>,
) -> Router {
    let router = router
        .route("/", get(index))
        .route("/invoice", get(invoice).with_state(AppState { client }))
        .layer(TraceLayer::new_for_http());

    setup_metrics_routes(router, recorder_handle)
}

pub async fn index() -> &'static str {
    "invoice gateway"
}

async fn invoice(
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Invoice>, GatewayError> {
    let obu_id = query
        .id
        .and_then(|id| parse_obu_id(&id))
        .ok_or(GatewayError::InvalidId)?;

    Ok(Json(state.client.invoice(obu_id).await?))
}
