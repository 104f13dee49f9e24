//! OpenRouter recommendation provider.
//!
//! Routes recommendation calls through OpenRouter's unified API, giving
//! access to multiple model providers with a single API key. Uses the
//! OpenAI-compatible chat completions format with JSON output mode.
//!
//! Primary model: Gemini Flash (fast, cheap, good at structured output).
//! Fallback model: Claude Haiku (used when the primary fails).

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

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const DEFAULT_PRIMARY_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_FALLBACK_MODEL: &str = "anthropic/claude-haiku-4.5";

const DEFAULT_MAX_TOKENS: u32 = 512;

/// Maximum retries on rate limit / server errors per model attempt.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Cost tables (approximate per-1K-token pricing via OpenRouter)
// ---------------------------------------------------------------------------

/// Returns (input_cost_per_1k, output_cost_per_1k) for known models.
fn model_costs(model: &str) -> (f64, f64) {
    match model {
        m if m.contains("gemini") && m.contains("flash") => (0.0003, 0.0025),
        m if m.contains("claude") && m.contains("sonnet") => (0.003, 0.015),
        m if m.contains("claude") && m.contains("haiku") => (0.001, 0.005),
        m if m.contains("gpt-4o") => (0.005, 0.015),
        // Conservative default
        _ => (0.005, 0.015),
    }
}

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenRouterClient {
    http: Client,
    api_key: SecretString,
    primary_model: String,
    fallback_model: Option<String>,
    max_tokens: u32,
    total_cost: AtomicU64, // stored as cost * 1_000_000
    total_calls: AtomicU64,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client.
    ///
    /// - `api_key`: OpenRouter API key.
    /// - `primary_model`: Primary model ID (e.g. "google/gemini-2.5-flash").
    /// - `fallback_model`: Optional fallback model for when primary fails.
    /// - `max_tokens`: Max output tokens per request.
    pub fn new(
        api_key: SecretString,
        primary_model: Option<String>,
        fallback_model: Option<String>,
        max_tokens: Option<u32>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build OpenRouter HTTP client")?;

        Ok(Self {
            http,
            api_key,
            primary_model: primary_model.unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string()),
            fallback_model: Some(
                fallback_model.unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string()),
            ),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            total_cost: AtomicU64::new(0),
            total_calls: AtomicU64::new(0),
        })
    }

    /// Send a chat completion request for a specific model, with retry +
    /// exponential backoff.
    async fn call_model(
        &self,
        model: &str,
        system: &str,
        user_message: &str,
    ) -> Result<(String, u32, f64)> {
        let request = ChatRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
            response_format: ResponseFormat { format_type: "json_object" },
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, model, "Retrying OpenRouter API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(OPENROUTER_API_URL)
                .header(
                    "Authorization",
                    format!("Bearer {}", self.api_key.expose_secret()),
                )
                .header("Content-Type", "application/json")
                .header("X-Title", "BETBOT Desk")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse OpenRouter response")?;

                        let text = body
                            .choices
                            .first()
                            .and_then(|c| c.message.as_ref())
                            .map(|m| m.content.clone())
                            .unwrap_or_default();

                        let usage = body.usage.unwrap_or(ChatUsage {
                            prompt_tokens: 0,
                            completion_tokens: 0,
                            total_tokens: 0,
                        });

                        // Use the actual model returned (may differ from requested)
                        let actual_model = body.model.as_deref().unwrap_or(model);
                        let (input_cost, output_cost) = model_costs(actual_model);

                        let cost = (usage.prompt_tokens as f64 / 1000.0) * input_cost
                            + (usage.completion_tokens as f64 / 1000.0) * output_cost;

                        self.total_cost
                            .fetch_add((cost * 1_000_000.0) as u64, Ordering::Relaxed);
                        self.total_calls.fetch_add(1, Ordering::Relaxed);

                        return Ok((text, usage.total_tokens, cost));
                    }

                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(
                            status = %status,
                            attempt,
                            model,
                            error = %error_text,
                            "Retryable OpenRouter error"
                        );
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("OpenRouter API error {status} (model={model}): {error_text}");
                }
                Err(e) => {
                    warn!(attempt, model, error = %e, "OpenRouter request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "OpenRouter API failed after {} retries (model={}): {}",
            MAX_RETRIES,
            model,
            last_error.unwrap_or_default()
        )
    }

    /// Call the primary model, falling back to the secondary if the
    /// primary fails.
    async fn call_api(&self, system: &str, user_message: &str) -> Result<(String, u32, f64)> {
        match self.call_model(&self.primary_model, system, user_message).await {
            Ok(result) => Ok(result),
            Err(primary_err) => {
                if let Some(ref fallback) = self.fallback_model {
                    warn!(
                        primary = %self.primary_model,
                        fallback = %fallback,
                        error = %primary_err,
                        "Primary model failed, falling back"
                    );
                    self.call_model(fallback, system, user_message)
                        .await
                        .with_context(|| {
                            format!(
                                "Both primary ({}) and fallback ({}) models failed. Primary error: {}",
                                self.primary_model, fallback, primary_err
                            )
                        })
                } else {
                    Err(primary_err)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Recommender implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Recommender for OpenRouterClient {
    async fn recommend(&self, game: &Game) -> Result<Recommendation> {
        let user_msg = prompt::build_prompt(game);

        debug!(
            game_id = %game.id,
            model = %self.primary_model,
            "Requesting recommendation via OpenRouter"
        );

        let (response_text, tokens, cost) = self
            .call_api(prompt::system_prompt(), &user_msg)
            .await
            .context("OpenRouter API call failed")?;

        let rec = prompt::parse_recommendation(&response_text)
            .context("Failed to parse recommendation from LLM response")?;

        info!(
            game_id = %game.id,
            recommendation = %rec.recommendation,
            confidence = format!("{:.0}%", rec.confidence),
            tokens,
            cost = format!("${:.4}", cost),
            "Recommendation complete (OpenRouter)"
        );

        Ok(rec)
    }

    fn usage(&self) -> RecommenderUsage {
        RecommenderUsage {
            model: self.primary_model.clone(),
            calls: self.total_calls.load(Ordering::Relaxed),
            cost_usd: self.total_cost.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
