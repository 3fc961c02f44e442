//! In-process collaborators wired by the binary when no external services
//! are attached.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    collaborators::{
        error::CollaboratorError,
        ports::{
            AgentIdentity, ContentSink, DiscoverySource, IdentityProvider, MediaAttachment,
            PlatformCredentials, PublishRecord, ThoughtContext, ThoughtGenerator,
        },
    },
    types::AgentDescriptor,
};

/// Deterministic thought source: renders the prompt with the agent's ticker
/// and a running sequence number.
#[derive(Debug, Default)]
pub struct TemplateThoughtGenerator {
    seq: AtomicU64,
}

impl TemplateThoughtGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThoughtGenerator for TemplateThoughtGenerator {
    async fn generate_thought(
        &self,
        prompt: &str,
        context: &ThoughtContext,
    ) -> Result<String, CollaboratorError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("${} #{seq}: {}", context.ticker, prompt.trim()))
    }
}

/// Sink that writes every publish to the log instead of an external platform.
#[derive(Debug, Default)]
pub struct TracingContentSink;

#[async_trait]
impl ContentSink for TracingContentSink {
    async fn publish(
        &self,
        agent_key: &str,
        content: &str,
        media: Option<&MediaAttachment>,
    ) -> Result<PublishRecord, CollaboratorError> {
        let record_id = format!("local:{}", Uuid::now_v7());
        tracing::info!(
            target: "collaborators.sink",
            agent_key = %agent_key,
            record_id = %record_id,
            has_media = media.is_some(),
            content = %content,
            "content_published"
        );
        Ok(PublishRecord {
            record_id,
            agent_key: agent_key.to_string(),
            content: content.to_string(),
        })
    }
}

/// Grants an identity to every agent key and credentials for a fixed set of
/// platforms.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    credentials: BTreeMap<String, String>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, platform: impl Into<String>, token: impl Into<String>) -> Self {
        self.credentials.insert(platform.into(), token.into());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn get_identity(
        &self,
        agent_key: &str,
    ) -> Result<Option<AgentIdentity>, CollaboratorError> {
        Ok(Some(AgentIdentity {
            agent_key: agent_key.to_string(),
            handle: None,
        }))
    }

    async fn get_credentials(
        &self,
        platform: &str,
    ) -> Result<Option<PlatformCredentials>, CollaboratorError> {
        Ok(self
            .credentials
            .get(platform)
            .map(|token| PlatformCredentials {
                platform: platform.to_string(),
                token: token.clone(),
            }))
    }
}

/// Discovery feed backed by the `discovery.agents` config section.
#[derive(Debug, Clone, Default)]
pub struct ConfigDiscovery {
    descriptors: Vec<AgentDescriptor>,
}

impl ConfigDiscovery {
    pub fn new(descriptors: Vec<AgentDescriptor>) -> Self {
        Self { descriptors }
    }
}

#[async_trait]
impl DiscoverySource for ConfigDiscovery {
    async fn discover(&self) -> Result<Vec<AgentDescriptor>, CollaboratorError> {
        Ok(self.descriptors.clone())
    }
}
