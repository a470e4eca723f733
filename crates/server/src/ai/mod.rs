//! Gemini implementation of the studio's AI collaborator

use async_trait::async_trait;
use graphite_studio::{AiCollaborator, AiError, TutorContext};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{DrawingVerdict, GeneratedModel, ImagePayload};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const VALIDATION_MODEL: &str = "gemini-1.5-flash";
const GENERATION_MODEL: &str = "gemini-3-flash-preview";
const CHAT_MODEL: &str = "gemini-3-flash-preview";
const TEMPERATURE: f64 = 0.1;

const VALIDATION_PROMPT: &str = r#"
You are a Senior Engineering Drawing Validator.
Your job is to strictly filter uploaded images.
Analyze the image and determine if it is a valid 2D Engineering/Technical Drawing (e.g., Orthographic projection, Isometric view, Blueprint, Circuit diagram, CAD screenshot, or technical sketch).

Return ONLY JSON:
{
  "isValid": boolean,
  "reason": "Brief explanation why"
}

Rules:
- REJECT photos of real objects, people, landscapes, or text documents.
- REJECT random doodles or non-technical art.
- ACCEPT hand-drawn technical sketches if they look like engineering diagrams.
"#;

const GENERATION_PROMPT: &str = r#"
You are a 3D Engineering CAD Vision System.
Analyze the engineering drawing and deconstruct it into an ordered list of primitives combined by Constructive Solid Geometry.

Steps:
1. The bottom-left corner of the main object is the local origin.
2. The first part is the base: the largest primary volume, usually a block.
3. List every add-on (protrusions, wedges) and cut-out (holes, slots).
4. Use the exact numbers from the drawing labels. "2 HOLES ø10" means two cylinders of radius 5.
5. Position is the CENTER of the primitive. A block 54 wide with its left edge at x=0 has its center at x=27.

Shapes and dimensions:
- 'cube': [width (x), height (y), depth (z)]
- 'cylinder': [radius, height, 0], axis along Y
- 'sphere': [radius, 0, 0]
- 'wedge': [width, height, depth], right-angled prism

Operations:
- 'base': the first object.
- 'add': union with the previous geometry.
- 'subtract': removes material from the previous geometry.

Rules:
- Wedge slopes face forward by default; rotate them (e.g. [0, 90, 0]) to match the drawing.
- Cylinders used as holes must be long enough to cut through (depth 20 → hole length 22).
- 'explanation' names what the part is, e.g. "Main Base Block", "Mounting Hole Left".

Return ONLY valid JSON matching the schema.
"#;

fn validation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isValid": { "type": "BOOLEAN" },
            "reason": { "type": "STRING" }
        },
        "required": ["isValid", "reason"]
    })
}

fn generation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING", "description": "Technical name of the part." },
            "parts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": { "type": "STRING", "enum": ["cube", "cylinder", "sphere", "wedge"] },
                        "operation": { "type": "STRING", "enum": ["base", "add", "subtract"] },
                        "dimensions": { "type": "ARRAY", "items": { "type": "NUMBER" }, "description": "[w, h, d] or [r, h, 0]" },
                        "position": { "type": "ARRAY", "items": { "type": "NUMBER" }, "description": "[x, y, z] of the center" },
                        "rotation": { "type": "ARRAY", "items": { "type": "NUMBER" }, "description": "[x, y, z] in degrees" },
                        "explanation": { "type": "STRING", "description": "What this primitive is." }
                    },
                    "required": ["type", "operation", "dimensions", "position", "rotation", "explanation"]
                }
            }
        },
        "required": ["name", "parts"]
    })
}

/// Image + instruction request asking for schema-constrained JSON
fn structured_request(image: &ImagePayload, prompt: &str, schema: Value) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "inlineData": { "mimeType": image.mime_type, "data": image.data } },
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
            "temperature": TEMPERATURE
        }
    })
}

fn chat_request(context: &TutorContext, message: &str) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": context.system_prompt() }] },
        "contents": [{ "role": "user", "parts": [{ "text": message }] }]
    })
}

/// Text of the first candidate part
fn response_text(body: &Value) -> Result<&str, AiError> {
    body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|c| c["content"]["parts"].as_array())
        .and_then(|parts| parts.first())
        .and_then(|part| part["text"].as_str())
        .filter(|text| !text.trim().is_empty())
        .ok_or(AiError::EmptyResponse)
}

fn parse_json<T: DeserializeOwned>(body: &Value) -> Result<T, AiError> {
    Ok(serde_json::from_str(response_text(body)?)?)
}

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
        }
    }
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &Value,
        credential: &str,
    ) -> Result<Value, AiError> {
        if credential.trim().is_empty() {
            return Err(AiError::MissingCredential);
        }

        let response = self
            .http
            .post(format!("{}/{model}:generateContent", self.base_url))
            .header("x-goog-api-key", credential)
            .json(request)
            .send()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AiCollaborator for GeminiClient {
    async fn validate_drawing(
        &self,
        image: &ImagePayload,
        credential: &str,
    ) -> Result<DrawingVerdict, AiError> {
        let request = structured_request(image, VALIDATION_PROMPT, validation_schema());
        let body = self.generate_content(VALIDATION_MODEL, &request, credential).await?;
        parse_json(&body)
    }

    async fn generate_parts(
        &self,
        image: &ImagePayload,
        credential: &str,
    ) -> Result<GeneratedModel, AiError> {
        let request = structured_request(image, GENERATION_PROMPT, generation_schema());
        let body = self.generate_content(GENERATION_MODEL, &request, credential).await?;
        parse_json(&body)
    }

    async fn chat(
        &self,
        context: &TutorContext,
        message: &str,
        credential: &str,
    ) -> Result<String, AiError> {
        let body = self
            .generate_content(CHAT_MODEL, &chat_request(context, message), credential)
            .await?;
        Ok(response_text(&body)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PartOperation, ShapeKind};

    fn candidate(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn test_request_carries_image_and_schema() {
        let image = ImagePayload::parse("data:image/png;base64,AAAA");
        let request = structured_request(&image, VALIDATION_PROMPT, validation_schema());
        let parts = &request["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert_eq!(request["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(request["generationConfig"]["responseSchema"]["required"][0], "isValid");
    }

    #[test]
    fn test_parse_verdict() {
        let verdict: DrawingVerdict =
            parse_json(&candidate(r#"{"isValid": false, "reason": "A photo of a cat"}"#)).unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.reason, "A photo of a cat");
    }

    #[test]
    fn test_parse_generation() {
        let text = r#"{"name": "Block", "parts": [
            {"type": "cube", "operation": "base", "dimensions": [54, 20, 30], "position": [27, 10, 15], "rotation": [0, 0, 0], "explanation": "Main block"},
            {"type": "cylinder", "operation": "subtract", "dimensions": [5, 22], "position": [10, 10, 15], "rotation": [90, 0, 0], "explanation": "Hole"}
        ]}"#;
        let model: GeneratedModel = parse_json(&candidate(text)).unwrap();
        assert_eq!(model.name, "Block");
        assert_eq!(model.parts[0].shape, ShapeKind::Cube);
        assert_eq!(model.parts[1].operation, PartOperation::Subtract);
        assert_eq!(model.parts[1].dimensions, [5.0, 22.0, 0.0]);
    }

    #[test]
    fn test_missing_text_is_empty_response() {
        assert!(matches!(response_text(&json!({ "candidates": [] })), Err(AiError::EmptyResponse)));
        assert!(matches!(response_text(&candidate("  ")), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn test_malformed_json() {
        let result: Result<DrawingVerdict, _> = parse_json(&candidate("not json"));
        assert!(matches!(result, Err(AiError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let client = GeminiClient::default();
        assert_eq!(client.base_url, API_BASE);
        let image = ImagePayload::parse("AAAA");
        let result = client.validate_drawing(&image, "").await;
        assert!(matches!(result, Err(AiError::MissingCredential)));
    }
}
