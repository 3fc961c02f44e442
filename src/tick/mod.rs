pub mod error;
pub mod policy;
pub mod random;
pub mod runtime;
pub mod scheduler;

pub use error::{TickError, TickErrorKind};
pub use policy::{
    DEFAULT_PROMPT, DEFAULT_SKILL_PROBABILITY, DecisionPolicy, PromptSource, TickPlan,
    UnknownSkillPolicy, resolve_prompt,
};
pub use random::{RandomSource, StdRandomSource};
pub use runtime::{TickOutcome, TickRuntime};
pub use scheduler::{
    OverlapPolicy, SchedulerSettings, TickHandle, TickScheduler, TickState, TickStats,
};
