pub mod agents;
pub mod attestation;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod logging;
pub mod observability;
pub mod orchestrator;
pub mod skills;
pub mod testing;
pub mod tick;
pub mod types;
