//! Synthetic odds model.
//!
//! Maps a sport and a stats snapshot to a three-way price. The model is
//! deliberately simple: a base probability per side nudged by score
//! differential and possession, with the leader's probability scaled up
//! as the clock runs down, then normalised against a fixed overround.

use crate::types::{GameStats, Odds, Sport};

/// Base win probability for each side before adjustments.
const BASE_PROB: f64 = 0.45;
/// Probability shift per point of score differential.
const SCORE_WEIGHT: f64 = 0.15;
/// Probability shift per possession point above 50%.
const POSSESSION_WEIGHT: f64 = 0.005;

const MIN_PRICE: f64 = 1.01;
const MAX_PRICE: f64 = 50.0;

const BASE_DRAW_PROB: f64 = 0.15;
const DRAW_PENALTY: f64 = 0.1;
const MIN_DRAW_PRICE: f64 = 1.1;

/// Compute the current price for a game. Pure: identical input always
/// yields identical output.
pub fn calculate_odds(sport: Sport, stats: &GameStats) -> Odds {
    let diff = stats.score_diff() as f64;
    let regulation = f64::from(sport.regulation_length());
    let elapsed = f64::from(stats.time);

    // 1.0 at kick-off, 2.0 at full time
    let time_factor = 1.0 + elapsed / regulation;

    let mut home_prob = BASE_PROB
        + diff * SCORE_WEIGHT
        + (f64::from(stats.possession[0]) - 50.0) * POSSESSION_WEIGHT;
    let mut away_prob = BASE_PROB - diff * SCORE_WEIGHT
        + (f64::from(stats.possession[1]) - 50.0) * POSSESSION_WEIGHT;

    if diff > 0.0 {
        home_prob *= time_factor;
    } else if diff < 0.0 {
        away_prob *= time_factor;
    }

    let total = home_prob + away_prob + sport.overround();

    let draw = sport.draw_closeness().map(|closeness| {
        let draw_prob = if stats.score_diff().unsigned_abs() < u64::from(closeness) {
            BASE_DRAW_PROB + elapsed / (regulation * 2.0)
        } else {
            BASE_DRAW_PROB - DRAW_PENALTY
        };
        round2(1.0 / draw_prob).max(MIN_DRAW_PRICE)
    });

    Odds {
        home: bounded_price(home_prob, total),
        away: bounded_price(away_prob, total),
        draw,
    }
}

/// 1 / normalised probability, rounded to cents and clamped to the
/// tradable range. Zero, negative or non-finite inputs land on a bound.
fn bounded_price(prob: f64, total: f64) -> f64 {
    round2(1.0 / (prob / total)).max(MIN_PRICE).min(MAX_PRICE)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
