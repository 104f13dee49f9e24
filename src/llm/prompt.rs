//! Prompt construction and response parsing shared by every LLM-backed
//! recommender.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::types::{Game, Recommendation, Selection};

/// Longest reasoning string kept from a response.
const MAX_REASONING_CHARS: usize = 1000;

pub fn system_prompt() -> &'static str {
    "You are a live sports trading analyst. You receive a snapshot of an \
     in-play game and decide whether a bet on the home side, the away side, \
     or the draw is a safe, high-probability position.\n\n\
     RULES:\n\
     1. Cross-reference momentum indicators: possession, shots, corners.\n\
     2. Prioritise the side with higher player form and momentum.\n\
     3. Treat disciplinary issues (fouls, yellow cards) as risk factors.\n\
     4. If your confidence is below 85, recommend SKIP.\n\
     5. Respond with a single JSON object and nothing else:\n\
        {\"confidence\": <0-100>, \"reasoning\": \"<one or two sentences>\", \
        \"recommendation\": \"HOME\" | \"AWAY\" | \"DRAW\" | \"SKIP\"}"
}

/// Build the user prompt describing a game snapshot.
pub fn build_prompt(game: &Game) -> String {
    let s = &game.stats;
    let mut prompt = String::with_capacity(800);

    prompt.push_str("Analyze the following live game and provide a betting recommendation.\n\n");
    prompt.push_str(&format!("SPORT: {}\n", game.sport));
    prompt.push_str(&format!("LEAGUE: {}\n", game.league));
    prompt.push_str(&format!("MATCHUP: {} vs {}\n", game.home_team, game.away_team));
    prompt.push_str(&format!("TIME ELAPSED: {} minutes\n", s.time));
    prompt.push_str(&format!("SCORE: {} - {}\n", s.score[0], s.score[1]));
    prompt.push_str(&format!("POSSESSION: {}% - {}%\n", s.possession[0], s.possession[1]));
    prompt.push_str(&format!("SHOTS ON TARGET: {} - {}\n", s.shots[0], s.shots[1]));
    prompt.push_str(&format!("CORNERS: {} - {}\n", s.corners[0], s.corners[1]));
    prompt.push_str(&format!("FOULS: {} - {}\n", s.fouls[0], s.fouls[1]));
    prompt.push_str(&format!("YELLOW CARDS: {} - {}\n", s.yellow_cards[0], s.yellow_cards[1]));
    prompt.push_str(&format!(
        "PLAYER FORM (0-10): {:.1} - {:.1}\n",
        s.player_form[0], s.player_form[1]
    ));
    prompt.push_str(&format!("ODDS: {}\n", game.odds));

    prompt
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    recommendation: Option<String>,
}

/// Parse a recommendation from model output.
///
/// Accepts a JSON object (optionally wrapped in prose or a code fence),
/// falling back to `RECOMMENDATION:` / `CONFIDENCE:` labels. Missing
/// fields default to confidence 0 and SKIP. Fails only when nothing
/// recognisable is present.
pub fn parse_recommendation(text: &str) -> Result<Recommendation> {
    if let Some(raw) = extract_json(text) {
        return Ok(from_raw(raw));
    }

    let upper = text.to_uppercase();
    let selection = extract_label(&upper, "RECOMMENDATION:");
    let confidence = extract_label(&upper, "CONFIDENCE:")
        .and_then(|s| s.trim_end_matches('%').parse::<f64>().ok());

    if selection.is_none() && confidence.is_none() {
        return Err(anyhow!("Could not parse recommendation from response"));
    }

    Ok(from_raw(RawRecommendation {
        confidence,
        reasoning: None,
        recommendation: selection,
    }))
}

fn from_raw(raw: RawRecommendation) -> Recommendation {
    let mut rec = Recommendation::skip("Failed to analyze.");

    if let Some(selection) = raw.recommendation.and_then(|s| s.parse::<Selection>().ok()) {
        rec.recommendation = selection;
    }
    if let Some(confidence) = raw.confidence.filter(|c| c.is_finite()) {
        rec.confidence = confidence.clamp(0.0, 100.0);
    }
    if let Some(reasoning) = raw.reasoning.filter(|r| !r.trim().is_empty()) {
        rec.reasoning = if reasoning.chars().count() > MAX_REASONING_CHARS {
            reasoning.chars().take(MAX_REASONING_CHARS).collect::<String>() + "..."
        } else {
            reasoning
        };
    }

    rec
}

/// Find the outermost `{...}` and deserialize it.
fn extract_json(text: &str) -> Option<RawRecommendation> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// First whitespace-delimited token after a label.
fn extract_label(text: &str, label: &str) -> Option<String> {
    let pos = text.find(label)?;
    let after = text[pos + label.len()..].trim_start();
    let token: String = after
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '%')
        .collect();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
