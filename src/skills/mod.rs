pub mod builtin;
pub mod error;
pub mod ports;
pub mod registry;

pub use builtin::{
    MARKET_SCAN_SKILL_ID, MarketScanSkill, SOCIAL_POST_SKILL_ID, SocialPostSkill,
    TRADE_SIM_SKILL_ID, TradeSimulationSkill, builtin_skill_registry,
};
pub use error::{SkillRegistryError, SkillRegistryErrorKind};
pub use ports::{Skill, SkillDescriptor, SkillInput};
pub use registry::{SkillRegistry, SkillRegistryBuilder};
