use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestationError {
    #[error("attestation key rejected: {0}")]
    InvalidKey(String),
    #[error("quote signature is not valid hex")]
    MalformedSignature,
    #[error("quote signature does not match payload")]
    SignatureMismatch,
    #[error("quote is stale: age {age_ms}ms exceeds window {window_ms}ms")]
    Stale { age_ms: u64, window_ms: u64 },
}
