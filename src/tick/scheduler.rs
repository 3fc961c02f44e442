//! Per-agent periodic tick driver.
//!
//! Each agent gets one driver task: it waits out a random initial jitter,
//! then fires on a fixed period until its cancellation token trips. Every
//! tick body runs in its own task so a slow collaborator never delays the
//! driver. Cancellation stops future ticks only; a tick already in flight
//! runs to completion.

use std::{
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    observability::metrics,
    tick::runtime::TickRuntime,
    types::{Agent, AgentId},
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_INITIAL_JITTER: Duration = Duration::from_secs(10);

/// What to do when a tick comes due while the previous one for the same
/// agent is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    #[default]
    SkipIfBusy,
    AllowOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub tick_interval: Duration,
    pub max_initial_jitter: Duration,
    pub overlap_policy: OverlapPolicy,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_initial_jitter: DEFAULT_MAX_INITIAL_JITTER,
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickState {
    Scheduled,
    Running,
    Hibernated,
}

impl TickState {
    fn encode(self) -> u8 {
        match self {
            TickState::Scheduled => 0,
            TickState::Running => 1,
            TickState::Hibernated => 2,
        }
    }

    fn decode(raw: u8) -> Self {
        match raw {
            0 => TickState::Scheduled,
            1 => TickState::Running,
            _ => TickState::Hibernated,
        }
    }
}

#[derive(Debug, Default)]
struct TickCounters {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped_busy: AtomicU64,
    in_flight: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped_busy: u64,
    pub in_flight: u64,
}

struct DriverShared {
    state: AtomicU8,
    busy: AtomicBool,
    counters: TickCounters,
}

impl DriverShared {
    fn set_state(&self, state: TickState) {
        self.state.store(state.encode(), Ordering::Release);
    }
}

/// Handle to one agent's driver. Owned by the agent registry.
pub struct TickHandle {
    cancel: CancellationToken,
    shared: Arc<DriverShared>,
}

impl TickHandle {
    pub fn state(&self) -> TickState {
        TickState::decode(self.shared.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> TickStats {
        let counters = &self.shared.counters;
        TickStats {
            started: counters.started.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            skipped_busy: counters.skipped_busy.load(Ordering::Relaxed),
            in_flight: counters.in_flight.load(Ordering::Relaxed),
        }
    }

    /// Stops future ticks. Idempotent.
    pub fn cancel(&self) {
        self.shared.set_state(TickState::Hibernated);
        self.cancel.cancel();
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct TickScheduler {
    runtime: Arc<TickRuntime>,
    settings: SchedulerSettings,
    root: CancellationToken,
    tracker: TaskTracker,
}

impl TickScheduler {
    pub fn new(runtime: Arc<TickRuntime>, settings: SchedulerSettings) -> Self {
        Self {
            runtime,
            settings,
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    pub fn runtime(&self) -> &Arc<TickRuntime> {
        &self.runtime
    }

    /// Spawns the driver for `agent`. Must be called inside a tokio runtime.
    pub fn start(&self, agent: Arc<RwLock<Agent>>) -> TickHandle {
        let agent_id = read_agent(&agent).id;
        let cancel = self.root.child_token();
        let shared = Arc::new(DriverShared {
            state: AtomicU8::new(TickState::Scheduled.encode()),
            busy: AtomicBool::new(false),
            counters: TickCounters::default(),
        });
        let initial_delay = self
            .runtime
            .random()
            .jitter(self.settings.max_initial_jitter);

        tracing::info!(
            target: "scheduler",
            agent_id = %agent_id,
            initial_delay_ms = initial_delay.as_millis() as u64,
            tick_interval_ms = self.settings.tick_interval.as_millis() as u64,
            overlap_policy = ?self.settings.overlap_policy,
            "tick_loop_scheduled"
        );

        let driver = Driver {
            agent_id,
            agent,
            runtime: Arc::clone(&self.runtime),
            settings: self.settings,
            cancel: cancel.clone(),
            shared: Arc::clone(&shared),
            tracker: self.tracker.clone(),
        };
        self.tracker.spawn(driver.run(initial_delay));

        TickHandle { cancel, shared }
    }

    /// Cancels every driver and refuses new ones. Idempotent.
    pub fn close(&self) {
        self.root.cancel();
        self.tracker.close();
    }

    pub fn is_closed(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancels every driver and waits for in-flight ticks to finish.
    pub async fn shutdown(&self) {
        self.close();
        self.tracker.wait().await;
        tracing::info!(target: "scheduler", "tick_scheduler_stopped");
    }
}

struct Driver {
    agent_id: AgentId,
    agent: Arc<RwLock<Agent>>,
    runtime: Arc<TickRuntime>,
    settings: SchedulerSettings,
    cancel: CancellationToken,
    shared: Arc<DriverShared>,
    tracker: TaskTracker,
}

impl Driver {
    async fn run(self, initial_delay: Duration) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.finish();
                return;
            }
            _ = tokio::time::sleep(initial_delay) => {}
        }

        self.shared.set_state(TickState::Running);
        let mut ticker = tokio::time::interval(self.settings.tick_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.fire(),
            }
        }

        self.finish();
    }

    fn fire(&self) {
        let counters = &self.shared.counters;
        if self.settings.overlap_policy == OverlapPolicy::SkipIfBusy
            && self.shared.busy.swap(true, Ordering::AcqRel)
        {
            counters.skipped_busy.fetch_add(1, Ordering::Relaxed);
            metrics::record_tick_skipped_busy();
            tracing::debug!(
                target: "scheduler",
                agent_id = %self.agent_id,
                "tick_skipped_busy"
            );
            return;
        }

        counters.started.fetch_add(1, Ordering::Relaxed);
        counters.in_flight.fetch_add(1, Ordering::Relaxed);

        // Snapshot so prompt/skill updates land on the next tick, not mid-tick.
        let agent = read_agent(&self.agent);
        let runtime = Arc::clone(&self.runtime);
        let shared = Arc::clone(&self.shared);
        self.tracker.spawn(async move {
            let result = runtime.run_tick_isolated(&agent).await;
            let counters = &shared.counters;
            match result {
                Ok(outcome) => {
                    counters.succeeded.fetch_add(1, Ordering::Relaxed);
                    metrics::record_tick(outcome.branch());
                }
                Err(err) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    metrics::record_tick_failure();
                    tracing::warn!(
                        target: "scheduler",
                        agent_id = %agent.id,
                        error_kind = ?err.kind,
                        error = %err,
                        "tick_failed"
                    );
                }
            }
            counters.in_flight.fetch_sub(1, Ordering::Relaxed);
            shared.busy.store(false, Ordering::Release);
        });
    }

    fn finish(&self) {
        self.shared.set_state(TickState::Hibernated);
        tracing::info!(
            target: "scheduler",
            agent_id = %self.agent_id,
            "tick_loop_stopped"
        );
    }
}

fn read_agent(agent: &RwLock<Agent>) -> Agent {
    agent
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone()
}
