use serde::{Deserialize, Serialize};

use crate::gemini::generate_content::types::{Content, Part};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContentPath {
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContentRequestBody {
    pub contents: Vec<Content>,
}

impl GenerateContentRequestBody {
    /// A single user turn carrying `prompt` as its only text part.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: None,
                parts: Some(vec![Part::text(prompt)]),
            }],
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateContentRequest {
    pub path: GenerateContentPath,
    pub body: GenerateContentRequestBody,
}
