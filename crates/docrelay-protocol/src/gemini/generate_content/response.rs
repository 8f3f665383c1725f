use serde::{Deserialize, Serialize};

use crate::gemini::generate_content::types::{Candidate, Content, Part, UsageMetadata};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Text of `candidates[0].content.parts[0]`.
    ///
    /// Returns `None` when any link in that chain is absent or the text is
    /// empty. Later candidates and parts are never consulted.
    pub fn first_text(&self) -> Option<&str> {
        self.first_candidate()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.is_empty())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_candidate()?.finish_reason.as_deref()
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.usage_metadata.as_ref()?.total_token_count
    }

    /// A single-candidate response carrying `text`, or no candidates at all.
    pub fn from_text(text: Option<&str>) -> Self {
        let candidates = text.map(|text| {
            vec![Candidate {
                content: Some(Content {
                    role: None,
                    parts: Some(vec![Part::text(text)]),
                }),
                finish_reason: None,
            }]
        });
        Self {
            candidates,
            ..Self::default()
        }
    }

    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.as_ref()?.first()
    }
}
