use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type AgentId = String;
pub type SkillId = u32;

/// Field inside agent metadata that carries the persona prompt.
pub const PERSONA_PROMPT_FIELD: &str = "prompt";

/// Descriptor handed to `register_agent`, usually produced by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub runtime_prompt: Option<String>,
    #[serde(default)]
    pub equipped_skill_ids: Vec<SkillId>,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ticker: ticker.into(),
            metadata: Value::Null,
            runtime_prompt: None,
            equipped_skill_ids: Vec::new(),
        }
    }
}

/// Partial descriptor accepted by `spawn_agent`; missing fields get defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub runtime_prompt: Option<String>,
    #[serde(default)]
    pub equipped_skill_ids: Option<Vec<SkillId>>,
}

impl SpawnManifest {
    pub fn into_descriptor(self, id: AgentId) -> AgentDescriptor {
        AgentDescriptor {
            name: self.name.unwrap_or_else(|| id.clone()),
            ticker: self.ticker.unwrap_or_default(),
            metadata: self.metadata.unwrap_or(Value::Null),
            runtime_prompt: self.runtime_prompt,
            equipped_skill_ids: self.equipped_skill_ids.unwrap_or_default(),
            id,
        }
    }
}

/// Live agent record. Identity fields and metadata are fixed at creation;
/// only the runtime prompt and equipped skills change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub ticker: String,
    pub runtime_prompt: Option<String>,
    pub equipped_skill_ids: Vec<SkillId>,
    pub metadata: Value,
}

impl From<AgentDescriptor> for Agent {
    fn from(descriptor: AgentDescriptor) -> Self {
        Self {
            id: descriptor.id,
            name: descriptor.name,
            ticker: descriptor.ticker,
            runtime_prompt: descriptor.runtime_prompt,
            equipped_skill_ids: descriptor.equipped_skill_ids,
            metadata: descriptor.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaError {
    pub message: String,
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PersonaError {}

impl Agent {
    /// Reads the persona prompt out of `metadata`.
    ///
    /// Metadata may be an object or a JSON document encoded as a string.
    /// `Ok(None)` means no persona is configured; `Err` means something is
    /// there but cannot be understood.
    pub fn persona_prompt(&self) -> Result<Option<String>, PersonaError> {
        persona_from_value(&self.metadata, true)
    }

    pub fn runtime_prompt_override(&self) -> Option<&str> {
        self.runtime_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }
}

fn persona_from_value(value: &Value, allow_encoded: bool) -> Result<Option<String>, PersonaError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => match map.get(PERSONA_PROMPT_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(prompt)) if prompt.trim().is_empty() => Ok(None),
            Some(Value::String(prompt)) => Ok(Some(prompt.clone())),
            Some(other) => Err(PersonaError {
                message: format!("metadata.{PERSONA_PROMPT_FIELD} must be a string, got {other}"),
            }),
        },
        Value::String(encoded) if allow_encoded => {
            if encoded.trim().is_empty() {
                return Ok(None);
            }
            let decoded: Value = serde_json::from_str(encoded).map_err(|err| PersonaError {
                message: format!("metadata is not valid json: {err}"),
            })?;
            persona_from_value(&decoded, false)
        }
        other => Err(PersonaError {
            message: format!("metadata must be an object, got {other}"),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnStatus {
    Spawned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnReceipt {
    pub status: SpawnStatus,
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HibernateStatus {
    Hibernating,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HibernateReceipt {
    pub status: HibernateStatus,
    pub agent_id: AgentId,
}
