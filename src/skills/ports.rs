use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    collaborators::MediaAttachment,
    types::{Agent, SkillId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub id: SkillId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillInput {
    pub thought: String,
    pub image: Option<MediaAttachment>,
}

impl SkillInput {
    pub fn from_thought(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            image: None,
        }
    }
}

/// A capability an agent can be equipped with.
///
/// `execute` never fails: side-effect failures are folded into the returned
/// outcome text so the tick can still attest to what happened.
#[async_trait]
pub trait Skill: Send + Sync {
    fn descriptor(&self) -> &SkillDescriptor;

    async fn execute(&self, agent: &Agent, input: SkillInput) -> String;
}
