use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    collaborators::error::CollaboratorError,
    types::{AgentDescriptor, AgentId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtPurpose {
    Publish,
    SkillInput,
    MarketScan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtContext {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub ticker: String,
    pub purpose: ThoughtPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub record_id: String,
    pub agent_key: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_key: String,
    pub handle: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct PlatformCredentials {
    pub platform: String,
    pub token: String,
}

impl fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("platform", &self.platform)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait ThoughtGenerator: Send + Sync {
    async fn generate_thought(
        &self,
        prompt: &str,
        context: &ThoughtContext,
    ) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn publish(
        &self,
        agent_key: &str,
        content: &str,
        media: Option<&MediaAttachment>,
    ) -> Result<PublishRecord, CollaboratorError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_identity(&self, agent_key: &str)
    -> Result<Option<AgentIdentity>, CollaboratorError>;

    async fn get_credentials(
        &self,
        platform: &str,
    ) -> Result<Option<PlatformCredentials>, CollaboratorError>;
}

#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn discover(&self) -> Result<Vec<AgentDescriptor>, CollaboratorError>;
}
