use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::http::header::{
    REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use docrelay_provider::Provider;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::access::{cors_layer, origin_guard, tag_client};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::handler::{favicon, generate_document, health, not_found};
use crate::rate_limit::{FixedWindowLimiter, rate_limit};

pub struct CoreState {
    pub provider: Arc<dyn Provider>,
    pub config: RelayConfig,
    pub limiter: Arc<FixedWindowLimiter>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(provider: Arc<dyn Provider>, config: RelayConfig) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::new(config.rate_limit));
        Self {
            state: Arc::new(CoreState {
                provider,
                config,
                limiter,
            }),
        }
    }

    pub fn router(&self) -> Router {
        let security_headers = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::if_not_present(
                X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                X_DNS_PREFETCH_CONTROL,
                HeaderValue::from_static("off"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("same-origin"),
            ));

        // Layers run outermost-last: trace, security headers, panic guard,
        // client tagging, origin guard, CORS, then the rate limiter.
        Router::new()
            .route(
                "/api/generate-document",
                post(generate_document).fallback(not_found),
            )
            .route("/api/health", get(health).fallback(not_found))
            .route("/favicon.ico", get(favicon).fallback(not_found))
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit,
            ))
            .layer(cors_layer(&self.state.config.allowed_origins))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                origin_guard,
            ))
            .layer(middleware::from_fn(tag_client))
            .layer(DefaultBodyLimit::max(self.state.config.body_limit))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(security_headers)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub fn limiter(&self) -> Arc<FixedWindowLimiter> {
        self.state.limiter.clone()
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(event = "handler_panic", detail = %detail);
    RelayError::Unhandled.into_response()
}
