pub mod clock;
pub mod error;
pub mod gate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AttestationError;
pub use gate::{
    AttestationGate, AttestationMode, AttestationQuote, DEFAULT_FRESHNESS_WINDOW_MS,
    ENCLAVE_MEASUREMENT_PLACEHOLDER, QUOTE_TAG_PREFIX,
};
