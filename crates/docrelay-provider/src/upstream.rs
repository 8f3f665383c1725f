use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use docrelay_protocol::gemini::generate_content::GenerateContentResponse;

use crate::error::{ProviderError, ProviderResult};

/// Reads the whole upstream body and decodes it when the status is 2xx.
pub async fn handle_response(response: wreq::Response) -> ProviderResult<GenerateContentResponse> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(upstream_failure(status, &body));
    }

    decode_body(&body)
}

pub fn upstream_failure(status: StatusCode, body: &Bytes) -> ProviderError {
    ProviderError::Upstream {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

const FIRST_TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

/// Decodes a 2xx body. Only unparsable JSON is an error: JSON that does not
/// fit the response shape is reduced to the text at `candidates[0]` so a
/// missing link surfaces as `EmptyGeneration`.
pub fn decode_body(body: &Bytes) -> ProviderResult<GenerateContentResponse> {
    let value: Value = serde_json::from_slice(body)?;
    match serde_json::from_value::<GenerateContentResponse>(value.clone()) {
        Ok(response) => Ok(response),
        Err(err) => {
            debug!(event = "upstream_shape_mismatch", error = %err);
            Ok(GenerateContentResponse::from_text(
                value.pointer(FIRST_TEXT_POINTER).and_then(Value::as_str),
            ))
        }
    }
}

/// The generated text, or `EmptyGeneration` when the response carries none.
pub fn extract_text(response: &GenerateContentResponse) -> ProviderResult<String> {
    response
        .first_text()
        .map(str::to_string)
        .ok_or(ProviderError::EmptyGeneration)
}
