use std::{sync::Arc, time::Duration};

use serde_json::json;

use fleet::{
    collaborators::StaticIdentityProvider,
    config::FleetConfig,
    orchestrator::Orchestrator,
    skills::{MARKET_SCAN_SKILL_ID, SOCIAL_POST_SKILL_ID, TRADE_SIM_SKILL_ID},
    testing::{RecordingSink, ScriptedRandom, ScriptedThoughts},
    tick::{DEFAULT_PROMPT, UnknownSkillPolicy},
};

use crate::{CountingSkill, Harness, advance, descriptor};

#[tokio::test(start_paused = true)]
async fn unregistered_skills_fall_through_to_publishing() {
    let harness = Harness::builder().always_skill().build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("hopeful", vec![404, 405]));

    advance(Duration::from_millis(35)).await;

    assert_eq!(harness.sink.count_for("hopeful"), 4);
    let stats = orchestrator.agent_status("hopeful").expect("live").stats;
    assert_eq!(stats.succeeded, 4);
    assert_eq!(stats.failed, 0);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn skip_tick_policy_leaves_unknown_skills_silent() {
    let harness = Harness::builder()
        .always_skill()
        .unknown_skill_policy(UnknownSkillPolicy::SkipTick)
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("quiet", vec![404]));

    advance(Duration::from_millis(35)).await;

    assert_eq!(harness.sink.count_for("quiet"), 0);
    assert!(harness.thoughts.calls_for("quiet").is_empty());
    let stats = orchestrator.agent_status("quiet").expect("live").stats;
    assert_eq!(stats.succeeded, 4);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn equipped_skills_are_replaced_wholesale() {
    let skill_1 = CountingSkill::new(1);
    let skill_2 = CountingSkill::new(2);
    let skill_5 = CountingSkill::new(5);
    let harness = Harness::builder()
        .skill(skill_1.clone())
        .skill(skill_2.clone())
        .skill(skill_5.clone())
        .random(ScriptedRandom::new().with_indices([1, 0]))
        .always_skill()
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("loadout", vec![1, 2]));

    advance(Duration::from_millis(15)).await;
    assert_eq!(skill_1.calls() + skill_2.calls(), 2);
    assert_eq!(skill_5.calls(), 0);
    let old_calls = skill_1.calls() + skill_2.calls();

    orchestrator.update_equipped_skills("loadout", vec![5]);
    let agent = orchestrator.agent_status("loadout").expect("live").agent;
    assert_eq!(agent.equipped_skill_ids, vec![5]);

    advance(Duration::from_millis(40)).await;
    assert_eq!(skill_1.calls() + skill_2.calls(), old_calls);
    assert_eq!(skill_5.calls(), 4);
    // Skill branch never publishes through the sink on its own.
    assert_eq!(harness.sink.count_for("loadout"), 0);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn runtime_prompt_overrides_persona_from_next_tick() {
    let harness = Harness::builder().build();
    let orchestrator = &harness.orchestrator;
    let mut persona = descriptor("voice", vec![]);
    persona.metadata = json!({"prompt": "P1"});
    orchestrator.register_agent(persona);

    advance(Duration::from_millis(15)).await;
    orchestrator.update_runtime_prompt("voice", "P2");
    advance(Duration::from_millis(20)).await;

    let prompts: Vec<String> = harness
        .thoughts
        .calls_for("voice")
        .into_iter()
        .map(|call| call.prompt)
        .collect();
    assert_eq!(prompts, vec!["P1", "P1", "P2", "P2"]);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unreadable_persona_uses_default_prompt() {
    let harness = Harness::builder().build();
    let orchestrator = &harness.orchestrator;
    let mut broken = descriptor("garbled", vec![]);
    broken.metadata = json!("{definitely not json");
    orchestrator.register_agent(broken);

    advance(Duration::from_millis(5)).await;

    let calls = harness.thoughts.calls_for("garbled");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, DEFAULT_PROMPT);
    assert_eq!(harness.sink.count_for("garbled"), 1);

    orchestrator.shutdown().await;
}

fn builtin_config() -> FleetConfig {
    let mut config = FleetConfig::default();
    config.attestation.secret_key = Some("builtin-test".to_string());
    config.attestation.secret_key_env = None;
    config.scheduler.tick_interval_ms = 10;
    config.scheduler.max_initial_jitter_ms = 0;
    config.scheduler.skill_probability = 1.0;
    config.scheduler.rng_seed = Some(42);
    config
}

#[tokio::test(start_paused = true)]
async fn builtin_skills_are_wired_from_config() {
    let thoughts = Arc::new(ScriptedThoughts::always("markets look calm"));
    let sink = Arc::new(RecordingSink::new());
    let identity = Arc::new(StaticIdentityProvider::new().with_credentials("social", "token"));
    let orchestrator =
        Orchestrator::from_config(&builtin_config(), thoughts.clone(), sink.clone(), identity)
            .expect("orchestrator builds");

    let catalog: Vec<_> = orchestrator
        .skill_catalog()
        .into_iter()
        .map(|skill| (skill.id, skill.name))
        .collect();
    assert_eq!(
        catalog,
        vec![
            (SOCIAL_POST_SKILL_ID, "social-post".to_string()),
            (TRADE_SIM_SKILL_ID, "trade-sim".to_string()),
            (MARKET_SCAN_SKILL_ID, "market-scan".to_string()),
        ]
    );

    orchestrator.register_agent(descriptor("poster", vec![SOCIAL_POST_SKILL_ID]));
    orchestrator.register_agent(descriptor("trader", vec![TRADE_SIM_SKILL_ID]));
    advance(Duration::from_millis(25)).await;

    assert_eq!(
        sink.contents_for("poster"),
        vec!["markets look calm"; 3],
        "social-post publishes the skill input thought"
    );
    assert_eq!(sink.count_for("trader"), 0);
    let trader = orchestrator.agent_status("trader").expect("live").stats;
    assert_eq!(trader.succeeded, 3);

    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn social_post_without_credentials_publishes_nothing() {
    let sink = Arc::new(RecordingSink::new());
    let orchestrator = Orchestrator::from_config(
        &builtin_config(),
        Arc::new(ScriptedThoughts::always("hello")),
        sink.clone(),
        Arc::new(StaticIdentityProvider::new()),
    )
    .expect("orchestrator builds");

    orchestrator.register_agent(descriptor("muted", vec![SOCIAL_POST_SKILL_ID]));
    advance(Duration::from_millis(15)).await;

    assert_eq!(sink.count_for("muted"), 0);
    let stats = orchestrator.agent_status("muted").expect("live").stats;
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 0);

    orchestrator.shutdown().await;
}
