//! Persona synthesis from a rough character description.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;
use crate::llm::provider::{CompletionProvider, CompletionRequest};

const PERSONA_TEMPERATURE: f32 = 0.7;

const PERSONA_PROMPT: &str = "You are a character builder for an NFT avatar project.
Convert the user's rough description into a concise persona object.

Return ONLY valid JSON with fields:
- name (string; 1-4 words; striking and brandable)
- tagline (string; one punchy sentence ≤120 chars)
- tags (array of 3-6 short keywords)
- longDescription (string; 100-150 words; include background, personality, signature traits, and a short lore hook)

Rules:
- English only.
- No empty fields.
- Avoid sensitive content, illegal topics, medical/financial advice.

";

/// A generated character.
///
/// Replaced wholesale on regeneration; never edited field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub tagline: String,
    pub tags: Vec<String>,
    #[serde(rename = "longDescription")]
    pub long_description: String,
    /// The full object the model returned, extra keys included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Persona {
    /// Fail with the first empty field.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.name.trim().is_empty() {
            return Err(LlmError::InvalidPersona { field: "name" });
        }
        if self.tagline.trim().is_empty() {
            return Err(LlmError::InvalidPersona { field: "tagline" });
        }
        if self.tags.iter().all(|tag| tag.trim().is_empty()) {
            return Err(LlmError::InvalidPersona { field: "tags" });
        }
        if self.long_description.trim().is_empty() {
            return Err(LlmError::InvalidPersona {
                field: "longDescription",
            });
        }
        Ok(())
    }
}

/// Fixed template with the user input embedded as `USER_INPUT: <<<...>>>`.
pub fn build_persona_prompt(source_text: &str) -> String {
    format!("{PERSONA_PROMPT}USER_INPUT: <<<{source_text}>>>")
}

/// Drop a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, `JSON`, ...) on the opening line.
    match body.find('\n') {
        Some(newline) if !body[..newline].trim().contains(' ') => body[newline + 1..].trim(),
        _ => body.trim(),
    }
}

/// Parse model output into a validated [`Persona`].
pub fn parse_persona(content: &str) -> Result<Persona, LlmError> {
    let json = strip_code_fence(content);
    let raw: Value = serde_json::from_str(json).map_err(|e| LlmError::MalformedPersona {
        reason: e.to_string(),
    })?;
    if !raw.is_object() {
        return Err(LlmError::MalformedPersona {
            reason: "expected a JSON object".to_string(),
        });
    }

    let mut persona: Persona =
        serde_json::from_value(raw.clone()).map_err(|e| LlmError::MalformedPersona {
            reason: e.to_string(),
        })?;
    persona.tags.retain(|tag| !tag.trim().is_empty());
    persona.raw = Some(raw);
    persona.validate()?;
    Ok(persona)
}

/// One completion request per generation; no retries.
#[derive(Clone)]
pub struct PersonaGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl PersonaGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn generate(&self, source_text: &str) -> Result<Persona, LlmError> {
        if source_text.trim().is_empty() {
            return Err(LlmError::EmptyInput);
        }

        let request =
            CompletionRequest::single(build_persona_prompt(source_text), PERSONA_TEMPERATURE);
        let response = self.provider.complete(request).await?;
        let content = response.first_content().unwrap_or_default();

        let persona = parse_persona(content)?;
        tracing::info!(name = %persona.name, tags = persona.tags.len(), "Persona generated");
        Ok(persona)
    }
}
