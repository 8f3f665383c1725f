use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use docrelay_protocol::relay::ErrorBody;
use docrelay_provider::ProviderError;

const INTERNAL_ERROR: &str = "Error interno del servidor";
const EMPTY_GENERATION_DETAILS: &str = "La API no devolvió contenido válido";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("El prompt es requerido")]
    InvalidInput,

    #[error("Configuración del servidor incompleta")]
    ServerMisconfigured,

    #[error("{0}")]
    UpstreamError(String),

    #[error("No se pudo generar el contenido")]
    EmptyGeneration,

    #[error("{0}")]
    InternalError(String),

    #[error("Demasiadas solicitudes, intente de nuevo en {window_minutes} minutos")]
    RateLimited {
        retry_after_secs: u64,
        window_minutes: u64,
    },

    #[error("No permitido por CORS")]
    CorsRejected,

    #[error("Endpoint no encontrado")]
    NotFound,

    #[error("Algo salió mal en el servidor")]
    Unhandled,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CorsRejected => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ServerMisconfigured
            | Self::UpstreamError(_)
            | Self::EmptyGeneration
            | Self::InternalError(_)
            | Self::Unhandled => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::UpstreamError(message) | Self::InternalError(message) => {
                ErrorBody::new(INTERNAL_ERROR).with_message(message.clone())
            }
            Self::EmptyGeneration => {
                ErrorBody::new(self.to_string()).with_details(EMPTY_GENERATION_DETAILS)
            }
            _ => ErrorBody::new(self.to_string()),
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredential => Self::ServerMisconfigured,
            ProviderError::Upstream { .. } => Self::UpstreamError(err.to_string()),
            ProviderError::EmptyGeneration => Self::EmptyGeneration,
            ProviderError::Transport(_)
            | ProviderError::Decode(_)
            | ProviderError::InvalidHeader(_) => Self::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Self::RateLimited {
            retry_after_secs, ..
        } = self
        {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
