use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    attestation::DEFAULT_FRESHNESS_WINDOW_MS,
    observability::metrics::MetricsRuntime,
    tick::{
        DEFAULT_SKILL_PROBABILITY, DecisionPolicy, OverlapPolicy, SchedulerSettings,
        UnknownSkillPolicy,
    },
    types::AgentDescriptor,
};

pub const DEFAULT_SCHEMA_FILE: &str = "fleet.schema.json";
pub const DEFAULT_SECRET_KEY_ENV: &str = "FLEET_ATTESTATION_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub attestation: AttestationConfig,
    #[serde(default)]
    pub consent: ConsentConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/fleet")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_stderr_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    #[default]
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFileFormat {
    #[default]
    Json,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default)]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    /// `off` disables the stderr layer.
    #[serde(default = "default_stderr_level")]
    pub stderr_level: String,
    #[serde(default)]
    pub file_format: LogFileFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: LoggingRotation::default(),
            retention_days: default_logging_retention_days(),
            stderr_level: default_stderr_level(),
            file_format: LogFileFormat::default(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    30_000
}

fn default_max_initial_jitter_ms() -> u64 {
    10_000
}

fn default_skill_probability() -> f64 {
    DEFAULT_SKILL_PROBABILITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_initial_jitter_ms")]
    pub max_initial_jitter_ms: u64,
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    #[serde(default = "default_skill_probability")]
    pub skill_probability: f64,
    #[serde(default)]
    pub unknown_skill_policy: UnknownSkillPolicy,
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_initial_jitter_ms: default_max_initial_jitter_ms(),
            overlap_policy: OverlapPolicy::default(),
            skill_probability: default_skill_probability(),
            unknown_skill_policy: UnknownSkillPolicy::default(),
            rng_seed: None,
        }
    }
}

impl SchedulerConfig {
    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            max_initial_jitter: Duration::from_millis(self.max_initial_jitter_ms),
            overlap_policy: self.overlap_policy,
        }
    }

    pub fn decision_policy(&self) -> DecisionPolicy {
        DecisionPolicy::new(self.skill_probability)
    }
}

fn default_secret_key_env() -> Option<String> {
    Some(DEFAULT_SECRET_KEY_ENV.to_string())
}

fn default_freshness_window_ms() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_MS
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AttestationConfig {
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Environment variable consulted when `secret_key` is absent.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: Option<String>,
    #[serde(default = "default_freshness_window_ms")]
    pub freshness_window_ms: u64,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            secret_key_env: default_secret_key_env(),
            freshness_window_ms: default_freshness_window_ms(),
        }
    }
}

impl std::fmt::Debug for AttestationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key_env", &self.secret_key_env)
            .field("freshness_window_ms", &self.freshness_window_ms)
            .finish()
    }
}

fn default_approved_prefix() -> String {
    "approved:".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    #[serde(default = "default_approved_prefix")]
    pub approved_prefix: String,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            approved_prefix: default_approved_prefix(),
        }
    }
}

fn default_market_scan_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    #[serde(default = "default_market_scan_timeout_ms")]
    pub market_scan_timeout_ms: u64,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            market_scan_timeout_ms: default_market_scan_timeout_ms(),
        }
    }
}

impl SkillsConfig {
    pub fn market_scan_timeout(&self) -> Duration {
        Duration::from_millis(self.market_scan_timeout_ms)
    }
}

fn default_metrics_listen_addr() -> SocketAddr {
    MetricsRuntime::default_listen_addr()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

impl FleetConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: FleetConfig =
            serde_json::from_value(config_value).context("failed to deserialize fleet config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join(DEFAULT_SCHEMA_FILE);
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {DEFAULT_SCHEMA_FILE} next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
