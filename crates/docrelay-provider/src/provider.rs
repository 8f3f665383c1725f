use async_trait::async_trait;

use crate::error::ProviderError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub trace_id: String,
    pub client_ip: Option<String>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Sends `prompt` upstream unmodified and returns the first generated text.
    async fn generate(&self, prompt: &str, ctx: CallContext) -> Result<String, ProviderError>;
}
