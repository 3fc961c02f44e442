use serde::{Deserialize, Serialize};

use crate::{
    tick::random::RandomSource,
    types::{Agent, PersonaError, SkillId},
};

pub const DEFAULT_SKILL_PROBABILITY: f64 = 0.3;
pub const DEFAULT_PROMPT: &str =
    "Share one short, original thought about what you are building and why it matters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPlan {
    InvokeSkill(SkillId),
    Default,
}

/// What a tick does when the chosen skill id is not in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSkillPolicy {
    /// Fail open: run the default think-and-publish path instead.
    #[default]
    #[serde(rename = "fall_through")]
    FallThroughToDefault,
    SkipTick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    skill_probability: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SKILL_PROBABILITY)
    }
}

impl DecisionPolicy {
    pub fn new(skill_probability: f64) -> Self {
        Self {
            skill_probability: skill_probability.clamp(0.0, 1.0),
        }
    }

    pub fn skill_probability(&self) -> f64 {
        self.skill_probability
    }

    /// Draws the branch for one tick. The skill draw happens even when the
    /// agent has nothing equipped so the random stream stays aligned.
    pub fn plan(&self, equipped: &[SkillId], random: &dyn RandomSource) -> TickPlan {
        let roll = random.unit();
        if roll >= self.skill_probability || equipped.is_empty() {
            return TickPlan::Default;
        }
        TickPlan::InvokeSkill(equipped[random.index(equipped.len())])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    RuntimeOverride(String),
    Persona(String),
    Default,
}

impl PromptSource {
    pub fn text(&self) -> &str {
        match self {
            PromptSource::RuntimeOverride(prompt) | PromptSource::Persona(prompt) => prompt,
            PromptSource::Default => DEFAULT_PROMPT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PromptSource::RuntimeOverride(_) => "runtime_override",
            PromptSource::Persona(_) => "persona",
            PromptSource::Default => "default",
        }
    }
}

/// Picks the prompt for a tick: runtime override, then persona, then the
/// built-in default. A persona that cannot be parsed is returned alongside
/// the fallback so the caller can log it.
pub fn resolve_prompt(agent: &Agent) -> (PromptSource, Option<PersonaError>) {
    if let Some(prompt) = agent.runtime_prompt_override() {
        return (PromptSource::RuntimeOverride(prompt.to_string()), None);
    }

    match agent.persona_prompt() {
        Ok(Some(prompt)) => (PromptSource::Persona(prompt), None),
        Ok(None) => (PromptSource::Default, None),
        Err(err) => (PromptSource::Default, Some(err)),
    }
}
