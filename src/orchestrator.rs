//! Management surface of the fleet: lifecycle calls, live updates, consent
//! lookups and status queries, all routed to the agent registry.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    agents::{AgentRegistry, AgentStatus, RegisterOutcome},
    attestation::AttestationGate,
    collaborators::{CollaboratorError, ContentSink, DiscoverySource, IdentityProvider, ThoughtGenerator},
    config::{ConsentConfig, FleetConfig},
    skills::{SkillDescriptor, builtin_skill_registry},
    tick::{SchedulerSettings, StdRandomSource, TickRuntime, TickScheduler},
    types::{
        AgentDescriptor, AgentId, HibernateReceipt, SkillId, SpawnManifest, SpawnReceipt,
        SpawnStatus,
    },
};

pub struct Orchestrator {
    registry: AgentRegistry,
    consent: ConsentConfig,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<TickRuntime>,
        settings: SchedulerSettings,
        consent: ConsentConfig,
    ) -> Self {
        Self {
            registry: AgentRegistry::new(TickScheduler::new(runtime, settings)),
            consent,
        }
    }

    /// Builds the gate, the built-in skills and the tick runtime from
    /// config around the supplied collaborators.
    pub fn from_config(
        config: &FleetConfig,
        thoughts: Arc<dyn ThoughtGenerator>,
        sink: Arc<dyn ContentSink>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let gate = AttestationGate::from_config(&config.attestation)
            .context("failed to construct attestation gate")?;
        let skills = builtin_skill_registry(
            Arc::clone(&sink),
            identity,
            Arc::clone(&thoughts),
            config.skills.market_scan_timeout(),
        )
        .context("failed to register built-in skills")?;
        let random = StdRandomSource::from_seed(config.scheduler.rng_seed);

        let runtime = TickRuntime::new(
            Arc::new(skills),
            Arc::new(gate),
            thoughts,
            sink,
            Arc::new(random),
        )
        .with_policy(config.scheduler.decision_policy())
        .with_unknown_skill_policy(config.scheduler.unknown_skill_policy);

        tracing::info!(
            target: "orchestrator",
            tick_interval_ms = config.scheduler.tick_interval_ms,
            max_initial_jitter_ms = config.scheduler.max_initial_jitter_ms,
            skill_probability = config.scheduler.skill_probability,
            skills = runtime.skills().len(),
            "orchestrator_configured"
        );

        Ok(Self::new(
            Arc::new(runtime),
            config.scheduler.settings(),
            config.consent.clone(),
        ))
    }

    /// Idempotent: a second call for a live id changes nothing. Spawns the
    /// agent's tick loop, so it must be called inside a tokio runtime.
    pub fn register_agent(&self, descriptor: AgentDescriptor) -> RegisterOutcome {
        self.registry.register(descriptor)
    }

    /// Registers with manifest defaults. Same runtime requirement as
    /// [`Orchestrator::register_agent`].
    pub fn spawn_agent(&self, agent_id: impl Into<AgentId>, manifest: SpawnManifest) -> SpawnReceipt {
        let agent_id = agent_id.into();
        let outcome = self
            .registry
            .register(manifest.into_descriptor(agent_id.clone()));
        tracing::info!(
            target: "orchestrator",
            agent_id = %agent_id,
            outcome = ?outcome,
            "agent_spawned"
        );
        SpawnReceipt {
            status: SpawnStatus::Spawned,
            agent_id,
        }
    }

    pub fn hibernate_agent(&self, agent_id: &str) -> HibernateReceipt {
        HibernateReceipt {
            status: self.registry.hibernate(agent_id),
            agent_id: agent_id.to_string(),
        }
    }

    /// Takes effect from the agent's next tick. Unknown ids are ignored.
    pub fn update_runtime_prompt(&self, agent_id: &str, prompt: impl Into<String>) {
        self.registry.update_runtime_prompt(agent_id, prompt.into());
    }

    /// Replaces the equipped set wholesale. Unknown ids are ignored.
    pub fn update_equipped_skills(&self, agent_id: &str, skill_ids: Vec<SkillId>) {
        self.registry.update_equipped_skills(agent_id, skill_ids);
    }

    /// Consent is keyed purely on the poll id's prefix.
    pub fn check_consent(&self, poll_id: &str) -> bool {
        let approved = poll_id.starts_with(&self.consent.approved_prefix);
        tracing::debug!(
            target: "orchestrator",
            poll_id = %poll_id,
            approved,
            "consent_checked"
        );
        approved
    }

    pub fn agent_status(&self, agent_id: &str) -> Option<AgentStatus> {
        self.registry.status(agent_id)
    }

    pub fn live_agent_ids(&self) -> Vec<AgentId> {
        self.registry.agent_ids()
    }

    pub fn skill_catalog(&self) -> Vec<SkillDescriptor> {
        self.registry.scheduler().runtime().skills().catalog()
    }

    /// Registers everything the discovery source reports.
    pub async fn bootstrap(&self, discovery: &dyn DiscoverySource) -> Result<usize, CollaboratorError> {
        let descriptors = discovery.discover().await?;
        let discovered = descriptors.len();
        let registered = descriptors
            .into_iter()
            .map(|descriptor| self.registry.register(descriptor))
            .filter(|outcome| *outcome == RegisterOutcome::Registered)
            .count();

        tracing::info!(
            target: "orchestrator",
            discovered,
            registered,
            "bootstrap_completed"
        );
        Ok(registered)
    }

    /// Hibernates every agent and waits for in-flight ticks. Registrations
    /// after this point return [`RegisterOutcome::Closed`].
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        tracing::info!(target: "orchestrator", "orchestrator_stopped");
    }
}
