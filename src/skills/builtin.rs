use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::{
    collaborators::{
        self, CollaboratorError, ContentSink, IdentityProvider, ThoughtContext, ThoughtGenerator,
        ThoughtPurpose,
    },
    skills::{
        error::SkillRegistryError,
        ports::{Skill, SkillDescriptor, SkillInput},
        registry::SkillRegistry,
    },
    types::{Agent, SkillId},
};

pub const SOCIAL_POST_SKILL_ID: SkillId = 1;
pub const TRADE_SIM_SKILL_ID: SkillId = 2;
pub const MARKET_SCAN_SKILL_ID: SkillId = 3;

const SOCIAL_PLATFORM: &str = "social";

pub fn builtin_skill_registry(
    sink: Arc<dyn ContentSink>,
    identity: Arc<dyn IdentityProvider>,
    thoughts: Arc<dyn ThoughtGenerator>,
    market_scan_timeout: Duration,
) -> Result<SkillRegistry, SkillRegistryError> {
    let registry = SkillRegistry::builder()
        .register(Arc::new(SocialPostSkill::new(sink, identity)))?
        .register(Arc::new(TradeSimulationSkill::new()))?
        .register(Arc::new(MarketScanSkill::new(thoughts, market_scan_timeout)))?
        .build();

    tracing::info!(
        target: "skills",
        skill_count = registry.len(),
        "skill_registry_built"
    );
    Ok(registry)
}

/// Publishes the input thought on the agent's social identity.
pub struct SocialPostSkill {
    descriptor: SkillDescriptor,
    sink: Arc<dyn ContentSink>,
    identity: Arc<dyn IdentityProvider>,
}

impl SocialPostSkill {
    pub fn new(sink: Arc<dyn ContentSink>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            descriptor: SkillDescriptor {
                id: SOCIAL_POST_SKILL_ID,
                name: "social-post".to_string(),
                description: "Publish the current thought to the agent's social feed".to_string(),
            },
            sink,
            identity,
        }
    }
}

#[async_trait]
impl Skill for SocialPostSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, agent: &Agent, input: SkillInput) -> String {
        match self.identity.get_identity(&agent.id).await {
            Ok(Some(_)) => {}
            Ok(None) => return format!("social post skipped: no identity bound to {}", agent.id),
            Err(err) => return format!("social post failed: identity lookup error: {err}"),
        }
        match self.identity.get_credentials(SOCIAL_PLATFORM).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return format!("social post skipped: no credentials for {SOCIAL_PLATFORM}");
            }
            Err(err) => return format!("social post failed: credential lookup error: {err}"),
        }

        match self
            .sink
            .publish(&agent.id, &input.thought, input.image.as_ref())
            .await
        {
            Ok(record) => format!("posted {} for {}", record.record_id, agent.ticker),
            Err(err) => format!("social post failed: {err}"),
        }
    }
}

/// Paper trade whose side and size are derived from the thought digest.
pub struct TradeSimulationSkill {
    descriptor: SkillDescriptor,
}

impl TradeSimulationSkill {
    pub fn new() -> Self {
        Self {
            descriptor: SkillDescriptor {
                id: TRADE_SIM_SKILL_ID,
                name: "trade-sim".to_string(),
                description: "Simulate a trade on the agent's own token".to_string(),
            },
        }
    }
}

impl Default for TradeSimulationSkill {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for TradeSimulationSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, agent: &Agent, input: SkillInput) -> String {
        let digest = Sha256::digest(input.thought.as_bytes());
        let side = if digest[0] & 1 == 0 { "BUY" } else { "SELL" };
        let units = u16::from_be_bytes([digest[1], digest[2]]) % 1_000 + 1;
        format!("simulated {side} {units} ${}", agent.ticker)
    }
}

/// Asks the thought collaborator for a market read, bounded by its own timeout.
pub struct MarketScanSkill {
    descriptor: SkillDescriptor,
    thoughts: Arc<dyn ThoughtGenerator>,
    timeout: Duration,
}

impl MarketScanSkill {
    pub fn new(thoughts: Arc<dyn ThoughtGenerator>, timeout: Duration) -> Self {
        Self {
            descriptor: SkillDescriptor {
                id: MARKET_SCAN_SKILL_ID,
                name: "market-scan".to_string(),
                description: "Summarise market sentiment around the agent's token".to_string(),
            },
            thoughts,
            timeout,
        }
    }
}

#[async_trait]
impl Skill for MarketScanSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, agent: &Agent, input: SkillInput) -> String {
        match self.scan(agent, &input.thought).await {
            Ok(summary) => format!("market scan: {summary}"),
            Err(err) => format!("market scan failed: {err}"),
        }
    }
}

impl MarketScanSkill {
    async fn scan(&self, agent: &Agent, thought: &str) -> Result<String, CollaboratorError> {
        let prompt = format!(
            "Scan the market for ${} and summarise in one line. Context: {thought}",
            agent.ticker
        );
        let context = ThoughtContext {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            ticker: agent.ticker.clone(),
            purpose: ThoughtPurpose::MarketScan,
        };

        tokio::time::timeout(
            self.timeout,
            self.thoughts.generate_thought(&prompt, &context),
        )
        .await
        .unwrap_or_else(|_| {
            Err(collaborators::error::timeout(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            )))
        })
    }
}
