use std::time::Duration;

use async_trait::async_trait;

use fleet::{
    skills::{Skill, SkillDescriptor, SkillInput},
    testing::{ScriptedRandom, ScriptedThoughts},
    tick::{OverlapPolicy, TickState},
    types::Agent,
};

use crate::{Harness, advance, descriptor};

struct PanickingSkill {
    descriptor: SkillDescriptor,
}

#[async_trait]
impl Skill for PanickingSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _agent: &Agent, _input: SkillInput) -> String {
        panic!("skill blew up")
    }
}

#[tokio::test(start_paused = true)]
async fn failing_agent_does_not_disturb_its_neighbours() {
    let harness = Harness::builder()
        .thoughts(ScriptedThoughts::always("steady").failing_for("b"))
        .build();
    let orchestrator = &harness.orchestrator;
    for id in ["a", "b", "c"] {
        orchestrator.register_agent(descriptor(id, vec![]));
    }

    advance(Duration::from_millis(35)).await;

    assert_eq!(harness.sink.count_for("a"), 4);
    assert_eq!(harness.sink.count_for("b"), 0);
    assert_eq!(harness.sink.count_for("c"), 4);

    let failing = orchestrator.agent_status("b").expect("b stays registered");
    assert_eq!(failing.stats.failed, 4);
    assert_eq!(failing.stats.succeeded, 0);
    assert_eq!(failing.state, TickState::Running);

    let healthy = orchestrator.agent_status("a").expect("a is live");
    assert_eq!(healthy.stats.succeeded, 4);
    assert_eq!(healthy.stats.failed, 0);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_skill_is_contained_to_its_tick() {
    let harness = Harness::builder()
        .skill(std::sync::Arc::new(PanickingSkill {
            descriptor: SkillDescriptor {
                id: 13,
                name: "unlucky".to_string(),
                description: "always panics".to_string(),
            },
        }))
        .always_skill()
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("cursed", vec![13]));
    orchestrator.register_agent(descriptor("plain", vec![]));

    advance(Duration::from_millis(25)).await;

    let cursed = orchestrator.agent_status("cursed").expect("cursed is live");
    assert_eq!(cursed.stats.started, 3);
    assert_eq!(cursed.stats.failed, 3);
    assert_eq!(cursed.stats.in_flight, 0);
    assert_eq!(harness.sink.count_for("plain"), 3);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn busy_agent_skips_overlapping_ticks() {
    let harness = Harness::builder()
        .thoughts(ScriptedThoughts::always("slow").with_delay(Duration::from_millis(25)))
        .overlap_policy(OverlapPolicy::SkipIfBusy)
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("slow", vec![]));

    // Due at 0..=50ms; the ticks started at 0 and 30 each hold the agent
    // for 25ms.
    advance(Duration::from_millis(52)).await;

    let stats = orchestrator.agent_status("slow").expect("live").stats;
    assert_eq!(stats.started, 2);
    assert_eq!(stats.skipped_busy, 4);
    assert_eq!(stats.in_flight, 1);
    assert_eq!(harness.sink.count_for("slow"), 1);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn allow_overlap_runs_every_due_tick() {
    let harness = Harness::builder()
        .thoughts(ScriptedThoughts::always("slow").with_delay(Duration::from_millis(25)))
        .overlap_policy(OverlapPolicy::AllowOverlap)
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("eager", vec![]));

    advance(Duration::from_millis(52)).await;

    let stats = orchestrator.agent_status("eager").expect("live").stats;
    assert_eq!(stats.started, 6);
    assert_eq!(stats.skipped_busy, 0);
    // Finished at 25, 35 and 45ms.
    assert_eq!(harness.sink.count_for("eager"), 3);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_in_flight_ticks_finish() {
    let harness = Harness::builder()
        .thoughts(ScriptedThoughts::always("slow").with_delay(Duration::from_millis(25)))
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("finisher", vec![]));

    advance(Duration::from_millis(5)).await;
    assert_eq!(harness.sink.count_for("finisher"), 0);

    orchestrator.shutdown().await;
    assert_eq!(harness.sink.count_for("finisher"), 1);
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_for_initial_jitter() {
    let harness = Harness::builder()
        .random(ScriptedRandom::new().with_jitter(Duration::from_millis(7)))
        .max_initial_jitter(Duration::from_secs(10))
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("late", vec![]));

    advance(Duration::from_millis(5)).await;
    let waiting = orchestrator.agent_status("late").expect("live");
    assert_eq!(waiting.state, TickState::Scheduled);
    assert_eq!(waiting.stats.started, 0);

    // First tick at 7ms, second at 17ms.
    advance(Duration::from_millis(15)).await;
    let running = orchestrator.agent_status("late").expect("live");
    assert_eq!(running.state, TickState::Running);
    assert_eq!(running.stats.started, 2);

    orchestrator.shutdown().await;
}
