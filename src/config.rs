//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! API keys are referenced by env-var name in the config and resolved at
//! runtime into a `SecretString`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub desk: DeskConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeskConfig {
    pub name: String,
    pub initial_balance: Decimal,
    pub currency: String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            name: "BETBOT".into(),
            initial_balance: dec!(10000),
            currency: "R".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    pub game_count: usize,
    pub tick_interval_secs: u64,
    /// Fixed RNG seed. Unset means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            game_count: 10,
            tick_interval_secs: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub scan_interval_secs: u64,
    pub stake: Decimal,
    pub confidence_threshold: f64,
    pub resolve_delay_secs: u64,
    pub equity_interval_secs: u64,
    #[serde(default)]
    pub start_active: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 10,
            stake: dec!(500),
            confidence_threshold: 85.0,
            resolve_delay_secs: 15,
            equity_interval_secs: 10,
            start_active: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Fallback model for OpenRouter (used when primary model fails).
    #[serde(default)]
    pub fallback_model: Option<String>,
    pub api_key_env: String,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".into(),
            model: "google/gemini-2.5-flash".into(),
            fallback_model: Some("anthropic/claude-haiku-4.5".into()),
            api_key_env: "OPENROUTER_API_KEY".into(),
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `memory`, `json` or `sqlite`.
    pub backend: String,
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "json".into(),
            path: "betbot_store.json".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.bot.stake > Decimal::ZERO, "bot.stake must be positive");
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.bot.confidence_threshold),
            "bot.confidence_threshold must be within 0..=100"
        );
        anyhow::ensure!(self.simulation.game_count > 0, "simulation.game_count must be positive");
        anyhow::ensure!(
            self.simulation.tick_interval_secs > 0
                && self.bot.scan_interval_secs > 0
                && self.bot.equity_interval_secs > 0,
            "intervals must be at least one second"
        );
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The configured LLM API key, if the variable is set and non-empty.
    pub fn llm_api_key(&self) -> Option<SecretString> {
        Self::resolve_env(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new)
    }
}
