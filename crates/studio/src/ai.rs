//! AI collaborator contract.
//!
//! The studio never talks to a model provider directly. The HTTP client lives
//! in the server crate; tests use the scripted collaborator from `harness`.

use async_trait::async_trait;
use serde::Serialize;
use shared::{DrawingVerdict, GeneratedModel, ImagePayload, Model};
use thiserror::Error;

/// Longest parts summary passed to the tutor, in characters.
pub const PARTS_SUMMARY_LIMIT: usize = 1000;

/// Collaborator failures: transport, provider errors, unparseable output
#[derive(Debug, Error)]
pub enum AiError {
    #[error("API credential is missing")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No response from AI")]
    EmptyResponse,

    #[error("malformed AI response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Malformed(e.to_string())
    }
}

#[async_trait]
pub trait AiCollaborator: Send + Sync {
    /// Is `image` an engineering drawing at all?
    async fn validate_drawing(
        &self,
        image: &ImagePayload,
        credential: &str,
    ) -> Result<DrawingVerdict, AiError>;

    /// Decompose the drawing into primitive parts. Ids are assigned later.
    async fn generate_parts(
        &self,
        image: &ImagePayload,
        credential: &str,
    ) -> Result<GeneratedModel, AiError>;

    /// Answer a tutoring question about one model.
    async fn chat(
        &self,
        context: &TutorContext,
        message: &str,
        credential: &str,
    ) -> Result<String, AiError>;
}

#[derive(Serialize)]
struct PartNote<'a> {
    op: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    note: &'a str,
}

/// What the tutor is told about the model under discussion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TutorContext {
    pub model_name: String,
    pub part_count: usize,
    /// JSON list of `{op, type, note}`, cut at `PARTS_SUMMARY_LIMIT` chars
    pub parts_summary: String,
}

impl TutorContext {
    pub fn from_model(model: &Model) -> Self {
        let notes: Vec<PartNote<'_>> = model
            .parts
            .iter()
            .map(|p| PartNote {
                op: p.operation.as_str(),
                kind: p.shape.as_str(),
                note: &p.explanation,
            })
            .collect();
        let summary = serde_json::to_string(&notes).unwrap_or_default();

        Self {
            model_name: model.name.clone(),
            part_count: model.parts.len(),
            parts_summary: summary.chars().take(PARTS_SUMMARY_LIMIT).collect(),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            r#"
You are an AI Engineering Tutor. You are currently analyzing a specific engineering drawing.
Model Context:
- Name: {name}
- Number of Features: {count}
- Dimensions/Parts List: {summary}

Your Responsibilities:
1. Explain the geometry and construction of THIS specific model.
2. Clarify engineering terminology related to the drawing.
3. Help the user understand the dimensions and 3D structure.

CRITICAL RULES:
- You must ONLY answer questions directly related to this engineering drawing or engineering concepts.
- If the user asks about unrelated topics, you must REFUSE.
- Reply: "I can only assist you with understanding this engineering drawing. Let's focus on the model."
"#,
            name = self.model_name,
            count = self.part_count,
            summary = self.parts_summary,
        )
    }

    /// First message shown when a model is opened
    pub fn welcome_message(&self) -> String {
        format!(
            "Hello! I see you're looking at \"{}\". I can help clarify specific features, explain dimensions, or walk you through the construction steps. What would you like to know?",
            self.model_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_context_from_model() {
        let model = fixtures::bracket_model();
        let ctx = TutorContext::from_model(&model);
        assert_eq!(ctx.model_name, model.name);
        assert_eq!(ctx.part_count, model.parts.len());
        assert!(ctx.parts_summary.starts_with(r#"[{"op":"base","type":"cube","note":"#));
        assert!(ctx.system_prompt().contains(&format!("- Number of Features: {}", model.parts.len())));
        assert!(ctx.welcome_message().contains(&model.name));
    }

    #[test]
    fn test_summary_is_truncated() {
        let mut model = fixtures::bracket_model();
        for part in &mut model.parts {
            part.explanation = "x".repeat(600);
        }
        let ctx = TutorContext::from_model(&model);
        assert_eq!(ctx.parts_summary.chars().count(), PARTS_SUMMARY_LIMIT);
    }
}
