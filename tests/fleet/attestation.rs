use std::{sync::Arc, time::Duration};

use fleet::{
    attestation::{
        AttestationError, AttestationGate, AttestationMode, Clock, DEFAULT_FRESHNESS_WINDOW_MS,
        ManualClock,
    },
    config::AttestationConfig,
};

use crate::{Harness, advance, descriptor};

/// Every reading lands ten minutes after the previous one, so quotes are
/// stale by the time they are checked.
struct DriftingClock {
    inner: ManualClock,
}

impl Clock for DriftingClock {
    fn now_ms(&self) -> u64 {
        let now = self.inner.now_ms();
        self.inner.advance(600_000);
        now
    }
}

#[tokio::test(start_paused = true)]
async fn stale_quotes_suppress_publishing_without_failing_the_tick() {
    let harness = Harness::builder()
        .clock(Arc::new(DriftingClock {
            inner: ManualClock::new(1_000),
        }))
        .build();
    let orchestrator = &harness.orchestrator;
    orchestrator.register_agent(descriptor("drifter", vec![]));

    advance(Duration::from_millis(25)).await;

    assert_eq!(harness.thoughts.calls_for("drifter").len(), 3);
    assert_eq!(harness.sink.count_for("drifter"), 0);
    let stats = orchestrator.agent_status("drifter").expect("live").stats;
    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.failed, 0);

    orchestrator.shutdown().await;
}

#[test]
fn quotes_age_out_after_the_freshness_window() {
    let clock = Arc::new(ManualClock::new(50_000));
    let gate = AttestationGate::new(Some("k"), DEFAULT_FRESHNESS_WINDOW_MS, clock.clone())
        .expect("gate");
    let quote = gate.generate_quote("ship it");

    clock.advance(DEFAULT_FRESHNESS_WINDOW_MS);
    assert!(gate.verify_quote(&quote, "ship it"), "exactly at the window is fresh");

    clock.advance(1);
    assert_eq!(
        gate.check_quote(&quote, "ship it"),
        Err(AttestationError::Stale {
            age_ms: DEFAULT_FRESHNESS_WINDOW_MS + 1,
            window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
        })
    );
}

#[test]
fn tampering_with_any_quote_field_is_rejected() {
    let clock = Arc::new(ManualClock::new(50_000));
    let gate = AttestationGate::new(Some("k"), DEFAULT_FRESHNESS_WINDOW_MS, clock).expect("gate");
    let quote = gate.generate_quote("original");

    assert!(gate.verify_quote(&quote, "original"));
    assert_eq!(
        gate.check_quote(&quote, "forged"),
        Err(AttestationError::SignatureMismatch)
    );

    let mut backdated = quote.clone();
    backdated.timestamp_ms -= 1;
    assert!(!gate.verify_quote(&backdated, "original"));

    let mut garbled = quote;
    garbled.signature = "not-hex".to_string();
    assert_eq!(
        gate.check_quote(&garbled, "original"),
        Err(AttestationError::MalformedSignature)
    );
}

#[test]
fn unconfigured_gate_runs_in_simulated_mode() {
    let config = AttestationConfig {
        secret_key: None,
        secret_key_env: Some("FLEET_TEST_SECRET_THAT_IS_NEVER_SET".to_string()),
        freshness_window_ms: 1_000,
    };
    let gate = AttestationGate::from_config_with_clock(&config, Arc::new(ManualClock::new(7)))
        .expect("gate");
    assert_eq!(gate.mode(), AttestationMode::Simulated);

    let quote = gate.generate_quote("payload");
    assert!(quote.opaque_tag.starts_with("MOCK_QUOTE_FOR:"));
    assert!(gate.verify_quote(&quote, "payload"));
}
