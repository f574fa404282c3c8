//! `/buyHSL`: fare purchase passthrough to the sales API.
//! No retries and no idempotency key: a call that fails in flight leaves the purchase
//! state unknown to the gateway.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Extension;
use tracing::{info, warn};

use super::AppState;
use crate::error::{passthrough, relay};
use crate::identity::Subject;

pub async fn buy(
    State(state): State<AppState>,
    Extension(Subject(user_id)): Extension<Subject>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_owned);
    info!(target: "faregate::fares", user = %user_id, bytes = body.len(), "forwarding fare purchase");
    match state.sales.purchase(content_type, body).await {
        Ok(reply) => {
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
            relay(status, reply.content_type.as_deref(), reply.body)
        }
        Err(e) => {
            warn!(target: "faregate::fares", user = %user_id, "fare purchase failed: {e}");
            passthrough(e)
        }
    }
}
