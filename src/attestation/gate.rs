//! Simulated hardware-attestation consent gate.
//!
//! A quote is an HMAC-SHA256 over `payload ":" timestamp_ms`. Verification
//! recomputes the MAC for the claimed timestamp and rejects quotes older than
//! the freshness window. Without a configured secret the gate signs with a
//! fixed fallback key: quotes keep their shape but prove nothing.

use std::{env, sync::Arc};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    attestation::{
        clock::{Clock, SystemClock},
        error::AttestationError,
    },
    config::AttestationConfig,
};

type HmacSha256 = Hmac<Sha256>;

pub const QUOTE_TAG_PREFIX: &str = "MOCK_QUOTE_FOR:";
pub const ENCLAVE_MEASUREMENT_PLACEHOLDER: &str = "SIMULATED_ENCLAVE_MEASUREMENT_V1";
pub const DEFAULT_FRESHNESS_WINDOW_MS: u64 = 300_000;
const FALLBACK_SECRET_KEY: &str = "fleet-simulated-enclave-fallback-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationQuote {
    pub opaque_tag: String,
    pub signature: String,
    pub timestamp_ms: u64,
    pub enclave_measurement: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationMode {
    Configured,
    Simulated,
}

pub struct AttestationGate {
    mac: HmacSha256,
    mode: AttestationMode,
    freshness_window_ms: u64,
    clock: Arc<dyn Clock>,
}

impl AttestationGate {
    pub fn new(
        secret_key: Option<&str>,
        freshness_window_ms: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AttestationError> {
        let (key, mode) = match secret_key.filter(|key| !key.is_empty()) {
            Some(key) => (key, AttestationMode::Configured),
            None => (FALLBACK_SECRET_KEY, AttestationMode::Simulated),
        };
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|err| AttestationError::InvalidKey(err.to_string()))?;

        match mode {
            AttestationMode::Simulated => tracing::warn!(
                target: "attestation",
                freshness_window_ms = freshness_window_ms,
                "attestation_simulated_mode: no secret key configured, quotes use the fallback key and carry no security guarantee"
            ),
            AttestationMode::Configured => tracing::info!(
                target: "attestation",
                freshness_window_ms = freshness_window_ms,
                "attestation_gate_ready"
            ),
        }

        Ok(Self {
            mac,
            mode,
            freshness_window_ms,
            clock,
        })
    }

    /// Resolves the key from config first, then from the configured
    /// environment variable.
    pub fn from_config(config: &AttestationConfig) -> Result<Self, AttestationError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    pub fn from_config_with_clock(
        config: &AttestationConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AttestationError> {
        let secret = config.secret_key.clone().or_else(|| {
            config
                .secret_key_env
                .as_deref()
                .and_then(|var| env::var(var).ok())
        });
        Self::new(secret.as_deref(), config.freshness_window_ms, clock)
    }

    pub fn mode(&self) -> AttestationMode {
        self.mode
    }

    pub fn freshness_window_ms(&self) -> u64 {
        self.freshness_window_ms
    }

    pub fn generate_quote(&self, payload: &str) -> AttestationQuote {
        let timestamp_ms = self.clock.now_ms();
        AttestationQuote {
            opaque_tag: format!("{QUOTE_TAG_PREFIX}{payload}"),
            signature: hex::encode(self.sign(payload, timestamp_ms)),
            timestamp_ms,
            enclave_measurement: ENCLAVE_MEASUREMENT_PLACEHOLDER.to_string(),
        }
    }

    pub fn verify_quote(&self, quote: &AttestationQuote, original_payload: &str) -> bool {
        self.check_quote(quote, original_payload).is_ok()
    }

    /// Same decision as `verify_quote`, with the reason for a rejection.
    pub fn check_quote(
        &self,
        quote: &AttestationQuote,
        original_payload: &str,
    ) -> Result<(), AttestationError> {
        let provided =
            hex::decode(&quote.signature).map_err(|_| AttestationError::MalformedSignature)?;

        let mut mac = self.mac.clone();
        mac.update(signed_message(original_payload, quote.timestamp_ms).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| AttestationError::SignatureMismatch)?;

        let age_ms = self.clock.now_ms().saturating_sub(quote.timestamp_ms);
        if age_ms > self.freshness_window_ms {
            return Err(AttestationError::Stale {
                age_ms,
                window_ms: self.freshness_window_ms,
            });
        }

        Ok(())
    }

    fn sign(&self, payload: &str, timestamp_ms: u64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(signed_message(payload, timestamp_ms).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn signed_message(payload: &str, timestamp_ms: u64) -> String {
    format!("{payload}:{timestamp_ms}")
}
