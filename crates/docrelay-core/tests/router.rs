use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use docrelay_core::{Core, RateLimitConfig, RelayConfig};
use docrelay_provider::{CallContext, GeminiConfig, GeminiProvider, Provider, ProviderError};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALLOWED_ORIGIN: &str = "http://localhost:8080";

#[derive(Clone, Copy)]
enum Reply {
    Text(&'static str),
    MissingCredential,
    Empty,
    Panic,
}

struct StubProvider {
    reply: Reply,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str, _ctx: CallContext) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Text(text) => Ok(format!("{text}:{prompt}")),
            Reply::MissingCredential => Err(ProviderError::MissingCredential),
            Reply::Empty => Err(ProviderError::EmptyGeneration),
            Reply::Panic => panic!("provider exploded"),
        }
    }
}

fn config() -> RelayConfig {
    RelayConfig {
        allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
        environment: "test".to_string(),
        ..RelayConfig::default()
    }
}

fn app(provider: Arc<dyn Provider>, config: RelayConfig) -> Router {
    Core::new(provider, config).router()
}

fn peer(last_octet: u8) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([10, 0, 0, last_octet], 40000)))
}

fn generate(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/generate-document")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer(1))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(peer(1))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn relays_generated_text() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let response = app(provider.clone(), config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "content": "ok:Hola" })
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn blank_prompt_is_rejected_without_upstream_call() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let app = app(provider.clone(), config());

    for body in [json!({ "prompt": "" }), json!({ "prompt": "   \n" }), json!({})] {
        let response = app.clone().oneshot(generate(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "El prompt es requerido" })
        );
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn body_without_json_content_type_counts_as_missing_prompt() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/generate-document")
        .extension(peer(1))
        .body(Body::from("prompt=Hola"))
        .unwrap();

    let response = app(provider.clone(), config()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_generic_server_error() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/generate-document")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer(1))
        .body(Body::from("{\"prompt\":"))
        .unwrap();

    let response = app(provider.clone(), config()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Algo salió mal en el servidor" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn missing_credential_is_server_misconfigured() {
    let provider = StubProvider::new(Reply::MissingCredential);
    let response = app(provider, config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Configuración del servidor incompleta" })
    );
}

#[tokio::test]
async fn empty_generation_is_reported() {
    let provider = StubProvider::new(Reply::Empty);
    let response = app(provider, config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({
            "error": "No se pudo generar el contenido",
            "details": "La API no devolvió contenido válido"
        })
    );
}

#[tokio::test]
async fn handler_panic_becomes_generic_error() {
    let provider = StubProvider::new(Reply::Panic);
    let response = app(provider, config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Algo salió mal en el servidor" })
    );
}

#[tokio::test]
async fn health_reports_environment() {
    let response = app(StubProvider::new(Reply::Text("ok")), config())
        .oneshot(get("/api/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "test");
    assert!(body["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
}

#[tokio::test]
async fn favicon_is_no_content() {
    let response = app(StubProvider::new(Reply::Text("ok")), config())
        .oneshot(get("/favicon.ico"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_route_and_wrong_method_are_not_found() {
    let app = app(StubProvider::new(Reply::Text("ok")), config());

    for request in [get("/nope"), get("/api/nope"), get("/api/generate-document")] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Endpoint no encontrado" })
        );
    }
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let response = app(StubProvider::new(Reply::Text("ok")), config())
        .oneshot(get("/api/health"))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "SAMEORIGIN");
}

#[tokio::test]
async fn disallowed_origin_never_reaches_handler() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let mut request = generate(json!({ "prompt": "Hola" }));
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

    let response = app(provider.clone(), config()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "No permitido por CORS" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn allowed_origin_gets_credentialed_cors_headers() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let mut request = generate(json!({ "prompt": "Hola" }));
    request
        .headers_mut()
        .insert(header::ORIGIN, ALLOWED_ORIGIN.parse().unwrap());

    let response = app(provider.clone(), config()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn preflight_from_allowed_origin_is_answered() {
    let provider = StubProvider::new(Reply::Text("ok"));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/generate-document")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .extension(peer(1))
        .body(Body::empty())
        .unwrap();

    let response = app(provider.clone(), config()).oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn fifty_first_request_in_window_is_rate_limited() {
    let app = app(StubProvider::new(Reply::Text("ok")), config());

    for n in 1..=50 {
        let response = app.clone().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {n}");
    }

    let response = app.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Demasiadas solicitudes, intente de nuevo en 15 minutos" })
    );

    let other_caller = Request::builder()
        .uri("/api/health")
        .extension(peer(2))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(other_caller).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_skips_non_api_paths() {
    let config = RelayConfig {
        rate_limit: RateLimitConfig {
            max: 1,
            window: Duration::from_secs(60),
        },
        ..config()
    };
    let app = app(StubProvider::new(Reply::Text("ok")), config);

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/favicon.ico")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    let response = app.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.headers()["ratelimit-remaining"], "0");
}

#[tokio::test]
async fn relays_through_gemini_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(header_is("x-goog-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Respuesta" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(GeminiConfig {
        api_key: Some("secret".to_string()),
        base_url: server.uri(),
        model: "gemini-test".to_string(),
        proxy: None,
    })
    .unwrap();

    let response = app(Arc::new(gemini), config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "content": "Respuesta" })
    );
}

#[tokio::test]
async fn upstream_failure_embeds_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(GeminiConfig {
        api_key: Some("secret".to_string()),
        base_url: server.uri(),
        model: "gemini-test".to_string(),
        proxy: None,
    })
    .unwrap();

    let response = app(Arc::new(gemini), config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({
            "error": "Error interno del servidor",
            "message": "Error de la API de Gemini: 503 Service Unavailable - overloaded"
        })
    );
}

#[tokio::test]
async fn missing_gemini_key_makes_no_outbound_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(GeminiConfig {
        api_key: None,
        base_url: server.uri(),
        model: "gemini-test".to_string(),
        proxy: None,
    })
    .unwrap();

    let response = app(Arc::new(gemini), config())
        .oneshot(generate(json!({ "prompt": "Hola" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
