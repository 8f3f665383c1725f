use http::header::InvalidHeaderValue;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("upstream credential is not configured")]
    MissingCredential,

    #[error("Error de la API de Gemini: {status} {reason} - {body}")]
    Upstream {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("La API no devolvió contenido válido")]
    EmptyGeneration,

    #[error("request error: {0}")]
    Transport(#[from] wreq::Error),

    #[error("invalid upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
