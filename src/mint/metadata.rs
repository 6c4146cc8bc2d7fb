//! INFT metadata document.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::crypto::{encode_hex_prefixed, keccak256};
use crate::llm::Persona;
use crate::storage::storage_uri;

const DEFAULT_AGENT_VERSION: &str = "1.0";

/// Keys written from the validated persona, never from `raw`.
const PERSONA_KEYS: [&str; 5] = ["name", "tagline", "tags", "longDescription", "version"];

/// The persona as embedded in metadata, with a version tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentMetadata {
    pub name: String,
    pub tagline: String,
    pub tags: Vec<String>,
    #[serde(rename = "longDescription")]
    pub long_description: String,
    /// Any other keys the model returned, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub version: String,
}

impl AgentMetadata {
    /// Keeps a `version` the model supplied, otherwise `1.0`.
    pub fn from_persona(persona: &Persona) -> Self {
        let extra = persona
            .raw
            .as_ref()
            .and_then(Value::as_object)
            .map(|raw| {
                raw.iter()
                    .filter(|(key, _)| !PERSONA_KEYS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let version = persona
            .raw
            .as_ref()
            .and_then(|raw| raw.get("version"))
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_AGENT_VERSION)
            .to_string();
        Self {
            name: persona.name.clone(),
            tagline: persona.tagline.clone(),
            tags: persona.tags.clone(),
            long_description: persona.long_description.clone(),
            extra,
            version,
        }
    }
}

/// Field order is fixed so the serialized bytes, and therefore the hash,
/// are reproducible from the same inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintMetadata {
    pub image: String,
    pub image_root: String,
    pub agent: AgentMetadata,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl MintMetadata {
    pub fn new(persona: &Persona, image_root: &str, created_at: i64) -> Self {
        Self {
            image: storage_uri(image_root),
            image_root: image_root.to_string(),
            agent: AgentMetadata::from_persona(persona),
            created_at,
        }
    }

    /// Serialize once and hash those exact bytes.
    pub fn seal(self) -> Result<SealedMetadata, serde_json::Error> {
        let json = serde_json::to_string(&self)?;
        let hash = encode_hex_prefixed(&keccak256(json.as_bytes()));
        Ok(SealedMetadata {
            metadata: self,
            json,
            hash,
        })
    }
}

/// Metadata plus the bytes that get uploaded and their Keccak-256 hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMetadata {
    pub metadata: MintMetadata,
    pub json: String,
    pub hash: String,
}
