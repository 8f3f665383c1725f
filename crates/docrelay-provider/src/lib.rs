pub mod error;
pub mod gemini;
pub mod provider;
pub mod upstream;

pub use error::ProviderError;
pub use gemini::{GeminiConfig, GeminiProvider};
pub use provider::{CallContext, Provider};
