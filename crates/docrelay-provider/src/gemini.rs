use std::time::Instant;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use docrelay_protocol::gemini::generate_content::{
    GenerateContentPath, GenerateContentRequest, GenerateContentRequestBody,
};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{CallContext, Provider};
use crate::upstream::{extract_text, handle_response};

pub const PROVIDER_NAME: &str = "gemini";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub proxy: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            proxy: None,
        }
    }
}

pub struct GeminiProvider {
    client: wreq::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> ProviderResult<Self> {
        let mut builder = wreq::Client::builder();
        if let Some(proxy) = config.proxy.as_deref().filter(|proxy| !proxy.trim().is_empty()) {
            builder = builder.proxy(wreq::Proxy::all(proxy)?);
        }
        let client = builder.build()?;

        let api_key = config.api_key.filter(|key| !key.trim().is_empty());
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url,
            model: config.model,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_for(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            path: GenerateContentPath {
                model: self.model.clone(),
            },
            body: GenerateContentRequestBody::from_prompt(prompt),
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(&self, prompt: &str, ctx: CallContext) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential)?;

        let request = self.request_for(prompt);
        let model = request.path.model;
        let path = format!("/v1beta/models/{model}:generateContent");
        let url = build_url(&self.base_url, &path);
        let headers = build_gemini_headers(api_key)?;

        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "gemini.generate",
            method = "POST",
            path = %path,
            model = %model,
            prompt_chars = prompt.chars().count()
        );
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&request.body)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    event = "upstream_response",
                    trace_id = %ctx.trace_id,
                    provider = %PROVIDER_NAME,
                    op = "gemini.generate",
                    status = "error",
                    elapsed_ms = started_at.elapsed().as_millis(),
                    error = %err
                );
                ProviderError::from(err)
            })?;
        info!(
            event = "upstream_response",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "gemini.generate",
            status = %response.status().as_u16(),
            elapsed_ms = started_at.elapsed().as_millis()
        );

        let body = handle_response(response).await?;
        info!(
            event = "upstream_generation",
            trace_id = %ctx.trace_id,
            client_ip = ctx.client_ip.as_deref().unwrap_or("-"),
            finish_reason = body.finish_reason().unwrap_or("-"),
            total_tokens = body.total_tokens(),
            model_version = body.model_version.as_deref().unwrap_or("-")
        );
        extract_text(&body)
    }
}

fn build_gemini_headers(api_key: &str) -> ProviderResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut value = HeaderValue::from_str(api_key)?;
    value.set_sensitive(true);
    headers.insert(API_KEY_HEADER, value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mut path = path.trim_start_matches('/');
    if base.ends_with("/v1beta") && (path == "v1beta" || path.starts_with("v1beta/")) {
        path = path.trim_start_matches("v1beta/").trim_start_matches("v1beta");
    }
    format!("{base}/{path}")
}
