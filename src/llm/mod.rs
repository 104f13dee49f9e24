//! Recommendation providers.
//!
//! Defines the `Recommender` trait and provides implementations backed by
//! OpenRouter and the Anthropic Messages API, plus a local heuristic used
//! when no API key is configured.

pub mod anthropic;
pub mod heuristic;
pub mod openrouter;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::types::{Game, Recommendation};

pub use anthropic::AnthropicClient;
pub use heuristic::HeuristicRecommender;
pub use openrouter::OpenRouterClient;

/// Abstraction over betting recommendation sources.
///
/// Transport and parsing failures surface as `Err`; callers treat them
/// as a SKIP. A response that parses but omits fields yields a
/// zero-confidence SKIP.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, game: &Game) -> Result<Recommendation>;

    /// Model in use, calls answered so far and their approximate spend.
    fn usage(&self) -> RecommenderUsage;
}

/// Running totals reported by a recommender.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommenderUsage {
    pub model: String,
    pub calls: u64,
    /// Approximate spend in USD.
    pub cost_usd: f64,
}

/// Pick the recommender named in the config. Falls back to the local
/// heuristic when no API key is available.
pub fn build_recommender(
    cfg: &LlmConfig,
    api_key: Option<SecretString>,
) -> Result<Arc<dyn Recommender>> {
    let Some(api_key) = api_key else {
        warn!(
            env = %cfg.api_key_env,
            "No LLM API key configured, using the offline heuristic recommender"
        );
        return Ok(Arc::new(HeuristicRecommender::new()));
    };

    let recommender: Arc<dyn Recommender> = match cfg.provider.as_str() {
        "anthropic" => {
            info!(model = %cfg.model, "Using Anthropic recommender");
            Arc::new(AnthropicClient::new(
                api_key,
                Some(cfg.model.clone()),
                Some(cfg.max_tokens),
            )?)
        }
        "heuristic" => {
            info!("Using offline heuristic recommender");
            Arc::new(HeuristicRecommender::new())
        }
        other => {
            if other != "openrouter" {
                warn!(provider = other, "Unknown LLM provider, defaulting to OpenRouter");
            }
            info!(
                model = %cfg.model,
                fallback = ?cfg.fallback_model,
                "Using OpenRouter recommender"
            );
            Arc::new(OpenRouterClient::new(
                api_key,
                Some(cfg.model.clone()),
                cfg.fallback_model.clone(),
                Some(cfg.max_tokens),
            )?)
        }
    };
    Ok(recommender)
}
