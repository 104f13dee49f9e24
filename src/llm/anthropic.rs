//! Anthropic Claude recommendation provider.
//!
//! Implements `Recommender` over the Anthropic Messages API. Handles
//! request construction, retry with exponential backoff on rate limits
//! and server errors, and cost tracking.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::prompt;
use super::{Recommender, RecommenderUsage};
use crate::types::{Game, Recommendation};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 512;

/// Maximum retries on rate limit / server errors.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

/// Approximate cost per 1K input tokens (Sonnet).
const INPUT_COST_PER_1K: f64 = 0.003;
/// Approximate cost per 1K output tokens (Sonnet).
const OUTPUT_COST_PER_1K: f64 = 0.015;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AnthropicClient {
    http: Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    total_cost: AtomicU64, // stored as cost * 1_000_000
    total_calls: AtomicU64,
}

impl AnthropicClient {
    pub fn new(api_key: SecretString, model: Option<String>, max_tokens: Option<u32>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            total_cost: AtomicU64::new(0),
            total_calls: AtomicU64::new(0),
        })
    }

    /// Send a messages request with retry + backoff.
    async fn call_api(&self, system: &str, user_message: &str) -> Result<(String, u32, f64)> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message.to_string(),
            }],
            system: Some(system.to_string()),
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying Anthropic API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self.http
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", self.api_key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: MessagesResponse = response.json().await
                            .context("Failed to parse Anthropic response")?;

                        let text = body.content.iter()
                            .filter_map(|b| b.text.as_deref())
                            .collect::<Vec<_>>()
                            .join("");

                        let usage = body.usage.unwrap_or(Usage {
                            input_tokens: 0,
                            output_tokens: 0,
                        });

                        let total_tokens = usage.input_tokens + usage.output_tokens;
                        let cost = (usage.input_tokens as f64 / 1000.0) * INPUT_COST_PER_1K
                            + (usage.output_tokens as f64 / 1000.0) * OUTPUT_COST_PER_1K;

                        self.total_cost.fetch_add((cost * 1_000_000.0) as u64, Ordering::Relaxed);
                        self.total_calls.fetch_add(1, Ordering::Relaxed);

                        return Ok((text, total_tokens, cost));
                    }

                    // Retryable errors: 429 (rate limit), 500+, 529 (overloaded)
                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, error = %error_text, "Retryable Anthropic API error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Anthropic API error {status}: {error_text}");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Anthropic request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "Anthropic API failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_default()
        )
    }
}

// ---------------------------------------------------------------------------
// Recommender implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Recommender for AnthropicClient {
    async fn recommend(&self, game: &Game) -> Result<Recommendation> {
        let user_msg = prompt::build_prompt(game);

        debug!(game_id = %game.id, model = %self.model, "Requesting recommendation");

        let (response_text, tokens, cost) = self
            .call_api(prompt::system_prompt(), &user_msg)
            .await
            .context("Anthropic API call failed")?;

        let rec = prompt::parse_recommendation(&response_text)
            .context("Failed to parse recommendation from LLM response")?;

        info!(
            game_id = %game.id,
            recommendation = %rec.recommendation,
            confidence = format!("{:.0}%", rec.confidence),
            tokens,
            cost = format!("${:.4}", cost),
            "Recommendation complete"
        );

        Ok(rec)
    }

    fn usage(&self) -> RecommenderUsage {
        RecommenderUsage {
            model: self.model.clone(),
            calls: self.total_calls.load(Ordering::Relaxed),
            cost_usd: self.total_cost.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
