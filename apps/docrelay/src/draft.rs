use docrelay_protocol::relay::GenerateRequest;
use serde::Deserialize;
use tracing::info;

use crate::cli::{DraftArgs, DraftDocument};
use crate::prompt::{
    PromptError, PromptTemplate, RightOfPetition, WitnessStatement, build_prompt,
};

pub const GENERIC_FAILURE: &str = "Error al generar el documento";

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Error de conexión con el servidor. Verifique que el backend esté ejecutándose.")]
    Unreachable(String),

    #[error("{0}")]
    Rejected(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] wreq::Error),
}

#[derive(Debug, Deserialize)]
struct RelayReply {
    #[serde(default)]
    success: bool,
    content: Option<String>,
    error: Option<String>,
}

pub struct DraftClient {
    client: wreq::Client,
    endpoint: String,
}

impl DraftClient {
    pub fn new(backend_url: &str) -> Result<Self, DraftError> {
        let client = wreq::Client::builder().build()?;
        let endpoint = format!(
            "{}/api/generate-document",
            backend_url.trim_end_matches('/')
        );
        Ok(Self { client, endpoint })
    }

    /// Posts `prompt` to the relay and returns the generated text, or the
    /// relay's error text when it refuses.
    pub async fn generate(&self, prompt: &str) -> Result<String, DraftError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_err(|err| DraftError::Unreachable(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| DraftError::Unreachable(err.to_string()))?;
        let reply: RelayReply = serde_json::from_slice(&body)
            .map_err(|err| DraftError::Unreachable(err.to_string()))?;

        match reply {
            RelayReply {
                success: true,
                content: Some(content),
                ..
            } if status.is_success() => Ok(content),
            RelayReply { error, .. } => Err(DraftError::Rejected(
                error.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            )),
        }
    }
}

pub(crate) fn prompt_for(document: &DraftDocument) -> Result<(String, &'static str), PromptError> {
    let template: Box<dyn PromptTemplate> = match document.clone() {
        DraftDocument::Witness {
            possessor_name,
            neighbor_name,
            years,
        } => Box::new(WitnessStatement {
            possessor_name,
            neighbor_name,
            years,
        }),
        DraftDocument::Petition {
            applicant_name,
            applicant_id,
            address,
        } => Box::new(RightOfPetition {
            applicant_name,
            applicant_id,
            address,
        }),
    };
    let prompt = build_prompt(template.as_ref())?;
    Ok((prompt, template.document_name()))
}

pub(crate) async fn run(args: DraftArgs) -> Result<(), DraftError> {
    let (prompt, document) = prompt_for(&args.document)?;

    if args.dry_run {
        println!("{prompt}");
        return Ok(());
    }

    info!(
        event = "draft_request",
        document = document,
        backend = %args.backend_url,
        prompt_chars = prompt.chars().count()
    );
    let content = DraftClient::new(&args.backend_url)?
        .generate(&prompt)
        .await?;
    println!("{content}");
    Ok(())
}
