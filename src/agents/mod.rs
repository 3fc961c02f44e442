pub mod registry;

pub use registry::{AgentRegistry, AgentStatus, RegisterOutcome};
