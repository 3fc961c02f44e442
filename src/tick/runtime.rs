//! One tick of an agent's decision loop.
//!
//! The skill branch attests to the skill outcome but does not verify the
//! quote; only the default branch gates its publish on `verify_quote`. The
//! asymmetry is kept as-is and surfaced through the `skill_quote_unverified`
//! log event.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;

use crate::{
    attestation::{AttestationError, AttestationGate, AttestationQuote},
    collaborators::{ContentSink, PublishRecord, ThoughtContext, ThoughtGenerator, ThoughtPurpose},
    observability::metrics,
    skills::{SkillInput, SkillRegistry},
    tick::{
        error::{TickError, panicked, publish_failed, thought_failed},
        policy::{DecisionPolicy, PromptSource, TickPlan, UnknownSkillPolicy, resolve_prompt},
        random::RandomSource,
    },
    types::{Agent, SkillId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    SkillDispatched {
        skill_id: SkillId,
        outcome: String,
        quote: AttestationQuote,
    },
    Published {
        record: PublishRecord,
        fell_through_from: Option<SkillId>,
    },
    Suppressed {
        reason: AttestationError,
        fell_through_from: Option<SkillId>,
    },
    SkippedUnknownSkill {
        skill_id: SkillId,
    },
}

impl TickOutcome {
    pub fn branch(&self) -> &'static str {
        match self {
            TickOutcome::SkillDispatched { .. } => "skill",
            TickOutcome::Published { .. } | TickOutcome::Suppressed { .. } => "default",
            TickOutcome::SkippedUnknownSkill { .. } => "skipped",
        }
    }
}

pub struct TickRuntime {
    skills: Arc<SkillRegistry>,
    gate: Arc<AttestationGate>,
    thoughts: Arc<dyn ThoughtGenerator>,
    sink: Arc<dyn ContentSink>,
    random: Arc<dyn RandomSource>,
    policy: DecisionPolicy,
    unknown_skill_policy: UnknownSkillPolicy,
}

impl TickRuntime {
    pub fn new(
        skills: Arc<SkillRegistry>,
        gate: Arc<AttestationGate>,
        thoughts: Arc<dyn ThoughtGenerator>,
        sink: Arc<dyn ContentSink>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            skills,
            gate,
            thoughts,
            sink,
            random,
            policy: DecisionPolicy::default(),
            unknown_skill_policy: UnknownSkillPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_unknown_skill_policy(mut self, unknown_skill_policy: UnknownSkillPolicy) -> Self {
        self.unknown_skill_policy = unknown_skill_policy;
        self
    }

    pub fn skills(&self) -> &Arc<SkillRegistry> {
        &self.skills
    }

    pub fn random(&self) -> &Arc<dyn RandomSource> {
        &self.random
    }

    /// Runs one tick and turns a panic anywhere inside it into a `TickError`.
    pub async fn run_tick_isolated(&self, agent: &Agent) -> Result<TickOutcome, TickError> {
        match AssertUnwindSafe(self.run_tick(agent)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(panicked(format!(
                "tick panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    #[tracing::instrument(
        name = "tick_run",
        target = "tick",
        skip(self, agent),
        fields(agent_id = %agent.id)
    )]
    pub async fn run_tick(&self, agent: &Agent) -> Result<TickOutcome, TickError> {
        let plan = self
            .policy
            .plan(&agent.equipped_skill_ids, self.random.as_ref());
        let fell_through_from = match plan {
            TickPlan::Default => None,
            TickPlan::InvokeSkill(skill_id) => match self.skills.resolve(skill_id) {
                Some(skill) => {
                    let prompt = self.prompt_for(agent);
                    let thought = self
                        .generate(agent, prompt.text(), ThoughtPurpose::SkillInput)
                        .await?;
                    let outcome = skill.execute(agent, SkillInput::from_thought(thought)).await;
                    let quote = self.gate.generate_quote(&outcome);
                    tracing::info!(
                        target: "tick",
                        agent_id = %agent.id,
                        skill_id = skill_id,
                        skill = %skill.descriptor().name,
                        outcome = %outcome,
                        "skill_dispatched"
                    );
                    tracing::debug!(
                        target: "tick",
                        agent_id = %agent.id,
                        skill_id = skill_id,
                        quote_timestamp_ms = quote.timestamp_ms,
                        "skill_quote_unverified"
                    );
                    return Ok(TickOutcome::SkillDispatched {
                        skill_id,
                        outcome,
                        quote,
                    });
                }
                None => match self.unknown_skill_policy {
                    UnknownSkillPolicy::FallThroughToDefault => {
                        tracing::debug!(
                            target: "tick",
                            agent_id = %agent.id,
                            skill_id = skill_id,
                            "unknown_skill_fall_through"
                        );
                        Some(skill_id)
                    }
                    UnknownSkillPolicy::SkipTick => {
                        tracing::debug!(
                            target: "tick",
                            agent_id = %agent.id,
                            skill_id = skill_id,
                            "unknown_skill_tick_skipped"
                        );
                        return Ok(TickOutcome::SkippedUnknownSkill { skill_id });
                    }
                },
            },
        };

        self.think_and_publish(agent, fell_through_from).await
    }

    async fn think_and_publish(
        &self,
        agent: &Agent,
        fell_through_from: Option<SkillId>,
    ) -> Result<TickOutcome, TickError> {
        let prompt = self.prompt_for(agent);
        let thought = self
            .generate(agent, prompt.text(), ThoughtPurpose::Publish)
            .await?;

        let quote = self.gate.generate_quote(&thought);
        if let Err(reason) = self.gate.check_quote(&quote, &thought) {
            metrics::record_attestation_rejection();
            tracing::warn!(
                target: "tick",
                agent_id = %agent.id,
                reason = %reason,
                "publish_suppressed_attestation_failed"
            );
            return Ok(TickOutcome::Suppressed {
                reason,
                fell_through_from,
            });
        }

        let record = self
            .sink
            .publish(&agent.id, &thought, None)
            .await
            .map_err(publish_failed)?;
        tracing::info!(
            target: "tick",
            agent_id = %agent.id,
            record_id = %record.record_id,
            prompt_source = prompt.label(),
            "thought_published"
        );
        Ok(TickOutcome::Published {
            record,
            fell_through_from,
        })
    }

    fn prompt_for(&self, agent: &Agent) -> PromptSource {
        let (source, persona_err) = resolve_prompt(agent);
        if let Some(err) = persona_err {
            tracing::warn!(
                target: "tick",
                agent_id = %agent.id,
                error = %err,
                "persona_unparsable_using_default_prompt"
            );
        }
        source
    }

    async fn generate(
        &self,
        agent: &Agent,
        prompt: &str,
        purpose: ThoughtPurpose,
    ) -> Result<String, TickError> {
        let context = ThoughtContext {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            ticker: agent.ticker.clone(),
            purpose,
        };
        self.thoughts
            .generate_thought(prompt, &context)
            .await
            .map_err(thought_failed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}
