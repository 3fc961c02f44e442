use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use serde::Serialize;

use crate::{
    observability::metrics,
    tick::{TickHandle, TickScheduler, TickState, TickStats},
    types::{Agent, AgentDescriptor, AgentId, HibernateStatus, SkillId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyPresent,
    /// The registry has been shut down and no longer schedules agents.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub agent: Agent,
    pub state: TickState,
    pub stats: TickStats,
}

struct AgentEntry {
    agent: Arc<RwLock<Agent>>,
    handle: TickHandle,
}

/// Live agents and the one tick handle each of them owns.
///
/// Insert-and-schedule happens under a single lock, so two concurrent
/// registrations of the same id can never produce two handles.
pub struct AgentRegistry {
    entries: Mutex<BTreeMap<AgentId, AgentEntry>>,
    scheduler: TickScheduler,
}

impl AgentRegistry {
    pub fn new(scheduler: TickScheduler) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn register(&self, descriptor: AgentDescriptor) -> RegisterOutcome {
        let mut entries = self.lock();
        if self.scheduler.is_closed() {
            tracing::warn!(
                target: "agents",
                agent_id = %descriptor.id,
                "register_rejected_after_shutdown"
            );
            return RegisterOutcome::Closed;
        }
        if entries.contains_key(&descriptor.id) {
            tracing::debug!(
                target: "agents",
                agent_id = %descriptor.id,
                "register_ignored_already_present"
            );
            return RegisterOutcome::AlreadyPresent;
        }

        let agent_id = descriptor.id.clone();
        let agent = Arc::new(RwLock::new(Agent::from(descriptor)));
        let handle = self.scheduler.start(Arc::clone(&agent));
        entries.insert(agent_id.clone(), AgentEntry { agent, handle });
        metrics::record_live_agents(entries.len());

        tracing::info!(
            target: "agents",
            agent_id = %agent_id,
            live_agents = entries.len(),
            "agent_registered"
        );
        RegisterOutcome::Registered
    }

    /// Cancels future ticks and drops the agent. A tick already running is
    /// left to finish.
    pub fn hibernate(&self, agent_id: &str) -> HibernateStatus {
        let mut entries = self.lock();
        let Some(entry) = entries.remove(agent_id) else {
            tracing::debug!(
                target: "agents",
                agent_id = %agent_id,
                "hibernate_not_found"
            );
            return HibernateStatus::NotFound;
        };

        entry.handle.cancel();
        metrics::record_live_agents(entries.len());
        tracing::info!(
            target: "agents",
            agent_id = %agent_id,
            ticks_started = entry.handle.stats().started,
            live_agents = entries.len(),
            "agent_hibernated"
        );
        HibernateStatus::Hibernating
    }

    pub fn update_runtime_prompt(&self, agent_id: &str, prompt: String) -> bool {
        self.mutate(agent_id, "runtime_prompt_updated", |agent| {
            agent.runtime_prompt = Some(prompt);
        })
    }

    /// Replaces the whole loadout; nothing from the previous set survives.
    pub fn update_equipped_skills(&self, agent_id: &str, skill_ids: Vec<SkillId>) -> bool {
        self.mutate(agent_id, "equipped_skills_replaced", |agent| {
            agent.equipped_skill_ids = skill_ids;
        })
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.lock().keys().cloned().collect()
    }

    pub fn status(&self, agent_id: &str) -> Option<AgentStatus> {
        self.lock().get(agent_id).map(|entry| AgentStatus {
            agent: read(&entry.agent).clone(),
            state: entry.handle.state(),
            stats: entry.handle.stats(),
        })
    }

    /// Drops every agent and waits for in-flight ticks. Later registrations
    /// return [`RegisterOutcome::Closed`].
    pub async fn shutdown(&self) {
        let drained = {
            let mut entries = self.lock();
            self.scheduler.close();
            std::mem::take(&mut *entries)
        };
        for entry in drained.values() {
            entry.handle.cancel();
        }
        metrics::record_live_agents(0);
        tracing::info!(
            target: "agents",
            hibernated = drained.len(),
            "agent_registry_drained"
        );
        drop(drained);
        self.scheduler.shutdown().await;
    }

    fn mutate(&self, agent_id: &str, event: &'static str, apply: impl FnOnce(&mut Agent)) -> bool {
        let entries = self.lock();
        let Some(entry) = entries.get(agent_id) else {
            tracing::debug!(
                target: "agents",
                agent_id = %agent_id,
                update = event,
                "update_ignored_unknown_agent"
            );
            return false;
        };

        apply(&mut entry.agent.write().unwrap_or_else(PoisonError::into_inner));
        tracing::info!(target: "agents", agent_id = %agent_id, update = event, "agent_updated");
        true
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AgentId, AgentEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read(agent: &RwLock<Agent>) -> std::sync::RwLockReadGuard<'_, Agent> {
    agent.read().unwrap_or_else(PoisonError::into_inner)
}
