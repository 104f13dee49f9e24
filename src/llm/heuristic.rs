//! Offline recommender.
//!
//! Scores a game from its live stats without any network call. Used when
//! no LLM API key is configured so the desk still runs end to end.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Recommender, RecommenderUsage};
use crate::types::{Game, Recommendation, Selection, Sport};

/// Confidence below which the heuristic recommends SKIP.
const ACT_THRESHOLD: f64 = 85.0;
/// Ceiling so the heuristic never claims certainty.
const MAX_CONFIDENCE: f64 = 97.0;

const MODEL_NAME: &str = "heuristic";

#[derive(Debug, Default)]
pub struct HeuristicRecommender {
    calls: AtomicU64,
}

impl HeuristicRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typical value of one scoring play, used to normalise leads.
    fn scoring_unit(sport: Sport) -> f64 {
        match sport {
            Sport::Soccer => 1.0,
            Sport::Rugby | Sport::Nfl => 7.0,
            Sport::Basketball => 10.0,
            Sport::Cricket => 30.0,
        }
    }

    /// Positive favours home, negative favours away.
    fn momentum(game: &Game) -> f64 {
        let s = &game.stats;
        let diff = |pair: [u32; 2]| f64::from(pair[0]) - f64::from(pair[1]);
        0.6 * (s.player_form[0] - s.player_form[1])
            + 0.05 * diff(s.possession)
            + 0.15 * diff(s.shots)
            + 0.1 * diff(s.corners)
            - 0.1 * diff(s.fouls)
            - 0.5 * diff(s.yellow_cards)
    }

    /// Score a game synchronously.
    pub fn assess(&self, game: &Game) -> Recommendation {
        let regulation = f64::from(game.sport.regulation_length());
        let progress = (f64::from(game.stats.time) / regulation).clamp(0.0, 1.0);
        let lead = game.stats.score_diff() as f64 / Self::scoring_unit(game.sport);
        let momentum = Self::momentum(game);

        let signal = lead * (1.0 + progress) + momentum * 0.25;
        let confidence = (50.0 + 15.0 * signal.abs()).min(MAX_CONFIDENCE);
        let side = if signal > 0.0 { Selection::Home } else { Selection::Away };

        let reasoning = format!(
            "Lead {:+.1} units at {:.0}% of regulation, momentum {:+.2}",
            lead,
            progress * 100.0,
            momentum
        );

        Recommendation {
            confidence,
            reasoning,
            recommendation: if confidence >= ACT_THRESHOLD { side } else { Selection::Skip },
        }
    }
}

#[async_trait]
impl Recommender for HeuristicRecommender {
    async fn recommend(&self, game: &Game) -> Result<Recommendation> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.assess(game))
    }

    fn usage(&self) -> RecommenderUsage {
        RecommenderUsage {
            model: MODEL_NAME.to_string(),
            calls: self.calls.load(Ordering::Relaxed),
            cost_usd: 0.0,
        }
    }
}
