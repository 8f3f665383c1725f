use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::ORIGIN;
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::core::CoreState;
use crate::error::RelayError;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Caller identity used for rate limiting: the peer IP address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

pub async fn tag_client(mut request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    request.extensions_mut().insert(ClientAddr(client));
    next.run(request).await
}

/// Rejects requests whose `Origin` is not on the allow-list. Requests without
/// an `Origin` header (curl, server-to-server) pass through.
pub async fn origin_guard(
    State(state): State<Arc<CoreState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|origin| state.config.is_origin_allowed(origin))
            .unwrap_or(false);
        if !allowed {
            warn!(
                event = "cors_rejected",
                origin = ?origin,
                path = %request.uri().path()
            );
            return RelayError::CorsRejected.into_response();
        }
    }
    next.run(request).await
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin = %origin, error = %err, "skipping invalid origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}
