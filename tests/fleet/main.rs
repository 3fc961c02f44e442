mod attestation;
mod dispatch;
mod scheduling;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use fleet::{
    attestation::{AttestationGate, Clock, DEFAULT_FRESHNESS_WINDOW_MS, ManualClock},
    config::ConsentConfig,
    orchestrator::Orchestrator,
    skills::{Skill, SkillDescriptor, SkillInput, SkillRegistry},
    testing::{RecordingSink, ScriptedRandom, ScriptedThoughts},
    tick::{OverlapPolicy, SchedulerSettings, TickRuntime, UnknownSkillPolicy},
    types::{Agent, AgentDescriptor, AgentId, SkillId},
};

pub const TICK: Duration = Duration::from_millis(10);

/// Skill that records which agents invoked it.
pub struct CountingSkill {
    descriptor: SkillDescriptor,
    calls: Mutex<Vec<AgentId>>,
}

impl CountingSkill {
    pub fn new(id: SkillId) -> Arc<Self> {
        Arc::new(Self {
            descriptor: SkillDescriptor {
                id,
                name: format!("counting-{id}"),
                description: "records invocations".to_string(),
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl Skill for CountingSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, agent: &Agent, _input: SkillInput) -> String {
        self.calls.lock().expect("calls lock").push(agent.id.clone());
        format!("{} ran for {}", self.descriptor.name, agent.id)
    }
}

pub struct HarnessBuilder {
    thoughts: ScriptedThoughts,
    random: ScriptedRandom,
    skills: Vec<Arc<dyn Skill>>,
    clock: Arc<dyn Clock>,
    overlap_policy: OverlapPolicy,
    unknown_skill_policy: UnknownSkillPolicy,
    skill_probability: f64,
    max_initial_jitter: Duration,
}

impl HarnessBuilder {
    pub fn thoughts(mut self, thoughts: ScriptedThoughts) -> Self {
        self.thoughts = thoughts;
        self
    }

    pub fn random(mut self, random: ScriptedRandom) -> Self {
        self.random = random;
        self
    }

    pub fn skill(mut self, skill: Arc<dyn Skill>) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn overlap_policy(mut self, overlap_policy: OverlapPolicy) -> Self {
        self.overlap_policy = overlap_policy;
        self
    }

    pub fn unknown_skill_policy(mut self, unknown_skill_policy: UnknownSkillPolicy) -> Self {
        self.unknown_skill_policy = unknown_skill_policy;
        self
    }

    pub fn max_initial_jitter(mut self, max_initial_jitter: Duration) -> Self {
        self.max_initial_jitter = max_initial_jitter;
        self
    }

    /// Forces every tick onto the skill branch.
    pub fn always_skill(mut self) -> Self {
        self.skill_probability = 1.0;
        self
    }

    pub fn build(self) -> Harness {
        let mut registry = SkillRegistry::builder();
        for skill in self.skills {
            registry = registry
                .register(skill)
                .expect("test skills have unique ids");
        }

        let gate = AttestationGate::new(Some("fleet-test"), DEFAULT_FRESHNESS_WINDOW_MS, self.clock)
            .expect("gate");
        let thoughts = Arc::new(self.thoughts);
        let sink = Arc::new(RecordingSink::new());
        let runtime = TickRuntime::new(
            Arc::new(registry.build()),
            Arc::new(gate),
            thoughts.clone(),
            sink.clone(),
            Arc::new(self.random),
        )
        .with_policy(fleet::tick::DecisionPolicy::new(self.skill_probability))
        .with_unknown_skill_policy(self.unknown_skill_policy);

        let settings = SchedulerSettings {
            tick_interval: TICK,
            max_initial_jitter: self.max_initial_jitter,
            overlap_policy: self.overlap_policy,
        };

        Harness {
            orchestrator: Orchestrator::new(Arc::new(runtime), settings, ConsentConfig::default()),
            thoughts,
            sink,
        }
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub thoughts: Arc<ScriptedThoughts>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    /// Ten-millisecond ticks, no jitter, default branch on every tick.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            thoughts: ScriptedThoughts::always("a thought"),
            random: ScriptedRandom::new(),
            skills: Vec::new(),
            clock: Arc::new(ManualClock::new(1_000)),
            overlap_policy: OverlapPolicy::SkipIfBusy,
            unknown_skill_policy: UnknownSkillPolicy::FallThroughToDefault,
            skill_probability: 0.3,
            max_initial_jitter: Duration::ZERO,
        }
    }
}

pub fn descriptor(id: &str, skills: Vec<SkillId>) -> AgentDescriptor {
    let mut descriptor = AgentDescriptor::new(id, format!("Agent {id}"), id.to_uppercase());
    descriptor.equipped_skill_ids = skills;
    descriptor
}

/// Sleeps on the paused tokio clock. Timer deadlines in the tests sit on
/// multiples of `TICK`, so callers pick offsets between them.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}
