//! Deterministic doubles for collaborators and randomness, shared by unit
//! and integration tests.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

pub use crate::attestation::ManualClock;
use crate::{
    collaborators::{
        CollaboratorError, ContentSink, MediaAttachment, PublishRecord, ThoughtContext,
        ThoughtGenerator, ThoughtPurpose, error::unavailable,
    },
    tick::RandomSource,
    types::AgentId,
};

/// Random source that replays queued draws, then repeats its fallbacks.
#[derive(Debug)]
pub struct ScriptedRandom {
    units: Mutex<VecDeque<f64>>,
    indices: Mutex<VecDeque<usize>>,
    fallback_unit: f64,
    jitter: Duration,
}

impl Default for ScriptedRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRandom {
    /// Defaults to the default branch on every tick and zero jitter.
    pub fn new() -> Self {
        Self {
            units: Mutex::new(VecDeque::new()),
            indices: Mutex::new(VecDeque::new()),
            fallback_unit: 0.99,
            jitter: Duration::ZERO,
        }
    }

    pub fn always_unit(mut self, unit: f64) -> Self {
        self.fallback_unit = unit;
        self
    }

    pub fn with_units(self, units: impl IntoIterator<Item = f64>) -> Self {
        lock(&self.units).extend(units);
        self
    }

    pub fn with_indices(self, indices: impl IntoIterator<Item = usize>) -> Self {
        lock(&self.indices).extend(indices);
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&self) -> f64 {
        lock(&self.units).pop_front().unwrap_or(self.fallback_unit)
    }

    fn index(&self, len: usize) -> usize {
        lock(&self.indices).pop_front().unwrap_or(0) % len.max(1)
    }

    fn jitter(&self, max: Duration) -> Duration {
        self.jitter.min(max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtCall {
    pub agent_id: AgentId,
    pub prompt: String,
    pub purpose: ThoughtPurpose,
}

/// Thought generator that answers with fixed text, optionally failing for
/// selected agents, and remembers every prompt it saw.
#[derive(Debug)]
pub struct ScriptedThoughts {
    reply: Result<String, String>,
    failing_agents: BTreeSet<AgentId>,
    delay: Duration,
    calls: Mutex<Vec<ThoughtCall>>,
}

impl ScriptedThoughts {
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            failing_agents: BTreeSet::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            ..Self::always("")
        }
    }

    pub fn failing_for(mut self, agent_id: impl Into<AgentId>) -> Self {
        self.failing_agents.insert(agent_id.into());
        self
    }

    /// Sleeps on the tokio clock before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ThoughtCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, agent_id: &str) -> Vec<ThoughtCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.agent_id == agent_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ThoughtGenerator for ScriptedThoughts {
    async fn generate_thought(
        &self,
        prompt: &str,
        context: &ThoughtContext,
    ) -> Result<String, CollaboratorError> {
        lock(&self.calls).push(ThoughtCall {
            agent_id: context.agent_id.clone(),
            prompt: prompt.to_string(),
            purpose: context.purpose,
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_agents.contains(&context.agent_id) {
            return Err(unavailable(format!(
                "thought backend unavailable for {}",
                context.agent_id
            )));
        }
        self.reply.clone().map_err(unavailable)
    }
}

/// Content sink that keeps every publish in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    failure: Option<String>,
    seq: AtomicU64,
    records: Mutex<Vec<PublishRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<PublishRecord> {
        lock(&self.records).clone()
    }

    pub fn contents_for(&self, agent_key: &str) -> Vec<String> {
        lock(&self.records)
            .iter()
            .filter(|record| record.agent_key == agent_key)
            .map(|record| record.content.clone())
            .collect()
    }

    pub fn count_for(&self, agent_key: &str) -> usize {
        lock(&self.records)
            .iter()
            .filter(|record| record.agent_key == agent_key)
            .count()
    }
}

#[async_trait]
impl ContentSink for RecordingSink {
    async fn publish(
        &self,
        agent_key: &str,
        content: &str,
        _media: Option<&MediaAttachment>,
    ) -> Result<PublishRecord, CollaboratorError> {
        if let Some(message) = &self.failure {
            return Err(unavailable(message.clone()));
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let record = PublishRecord {
            record_id: format!("rec:{seq}"),
            agent_key: agent_key.to_string(),
            content: content.to_string(),
        };
        lock(&self.records).push(record.clone());
        Ok(record)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
