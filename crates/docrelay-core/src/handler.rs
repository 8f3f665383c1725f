use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use docrelay_protocol::relay::{GenerateRequest, GenerateResponse, HealthResponse};
use docrelay_provider::CallContext;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::access::ClientAddr;
use crate::core::CoreState;
use crate::error::RelayError;

pub async fn generate_document(
    State(state): State<Arc<CoreState>>,
    Extension(client): Extension<ClientAddr>,
    headers: HeaderMap,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let trace_id = request_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());

    let provider = state.provider.name();
    let client_ip = client.0.clone();

    match relay(&state, &trace_id, client, payload).await {
        Ok(content) => {
            info!(
                event = "relay_completed",
                trace_id = %trace_id,
                provider = %provider,
                client_ip = %client_ip,
                content_chars = content.chars().count()
            );
            Json(GenerateResponse::ok(content)).into_response()
        }
        Err(err) => {
            if err.status().is_server_error() {
                error!(
                    event = "relay_failed",
                    trace_id = %trace_id,
                    provider = %provider,
                    client_ip = %client_ip,
                    error = %err
                );
            } else {
                warn!(
                    event = "relay_rejected",
                    trace_id = %trace_id,
                    client_ip = %client_ip,
                    error = %err
                );
            }
            err.into_response()
        }
    }
}

async fn relay(
    state: &CoreState,
    trace_id: &str,
    client: ClientAddr,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<String, RelayError> {
    let Json(request) = payload.map_err(rejection_error)?;
    let prompt = request.prompt().ok_or(RelayError::InvalidInput)?;

    let ctx = CallContext {
        trace_id: trace_id.to_string(),
        client_ip: Some(client.0),
    };
    Ok(state.provider.generate(prompt, ctx).await?)
}

/// A body without a JSON content type is treated as an empty object, so it
/// fails prompt validation. Well-formed JSON of the wrong shape is an internal
/// error; anything unparsable falls through to the catch-all.
fn rejection_error(rejection: JsonRejection) -> RelayError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => RelayError::InvalidInput,
        JsonRejection::JsonDataError(err) => RelayError::InternalError(err.body_text()),
        other => {
            warn!(event = "body_rejected", error = %other.body_text());
            RelayError::Unhandled
        }
    }
}

pub async fn health(State(state): State<Arc<CoreState>>) -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp,
        environment: state.config.environment.clone(),
    })
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found() -> RelayError {
    RelayError::NotFound
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("request-id"))
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}
