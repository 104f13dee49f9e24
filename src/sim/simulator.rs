//! Live-game simulator.
//!
//! Generates fixtures from the catalog and evolves them one clock unit
//! per tick. A game whose clock runs past regulation is replaced by a
//! freshly generated fixture.

use tracing::debug;
use uuid::Uuid;

use super::catalog;
use super::odds::calculate_odds;
use super::random::RandomSource;
use crate::types::{Game, GameStats, GameStatus, Sport};

// Per-tick event probabilities
const SCORE_EVENT_PROB: f64 = 0.02;
const CORNER_EVENT_PROB: f64 = 0.1;
const FOUL_EVENT_PROB: f64 = 0.2;

/// Generate one fresh fixture with randomised in-play stats.
pub fn generate_game(rng: &mut dyn RandomSource) -> Game {
    let sport = Sport::ALL[rng.below(Sport::ALL.len())];
    let leagues = catalog::leagues(sport);
    let league = &leagues[rng.below(leagues.len())];
    let teams = league.teams;

    let home_idx = rng.below(teams.len());
    // Draw from the remaining teams so the two sides are always distinct
    let mut away_idx = rng.below(teams.len() - 1);
    if away_idx >= home_idx {
        away_idx += 1;
    }

    let regulation = sport.regulation_length() as usize;
    let time = rng.below(regulation) as u32;

    let score = match sport {
        Sport::Soccer => [rng.below(4) as u32, rng.below(4) as u32],
        Sport::Rugby => [rng.below(40) as u32, rng.below(40) as u32],
        Sport::Basketball => [80 + rng.below(40) as u32, 80 + rng.below(40) as u32],
        Sport::Cricket | Sport::Nfl => [rng.below(200) as u32, rng.below(200) as u32],
    };

    let home_possession = 40 + rng.below(20) as u32;

    let stats = GameStats {
        score,
        possession: [home_possession, 100 - home_possession],
        shots: [rng.below(25) as u32, rng.below(25) as u32],
        yellow_cards: [rng.below(4) as u32, rng.below(4) as u32],
        corners: [rng.below(12) as u32, rng.below(12) as u32],
        fouls: [rng.below(18) as u32, rng.below(18) as u32],
        player_form: [random_form(rng), random_form(rng)],
        time,
    };

    let odds = calculate_odds(sport, &stats);

    Game {
        id: Uuid::new_v4().to_string(),
        sport,
        league: league.name.to_string(),
        home_team: teams[home_idx].to_string(),
        away_team: teams[away_idx].to_string(),
        odds,
        stats,
        status: GameStatus::Live,
    }
}

/// Form index in [5.0, 10.0), one decimal place.
fn random_form(rng: &mut dyn RandomSource) -> f64 {
    ((5.0 + rng.next_f64() * 5.0) * 10.0).floor() / 10.0
}

/// Generate `count` independent fixtures.
pub fn generate_live_games(count: usize, rng: &mut dyn RandomSource) -> Vec<Game> {
    (0..count).map(|_| generate_game(rng)).collect()
}

/// Points awarded by a single scoring event.
fn score_points(sport: Sport, rng: &mut dyn RandomSource) -> u32 {
    match sport {
        Sport::Rugby => {
            if rng.chance(0.7) { 5 } else { 3 }
        }
        Sport::Cricket => rng.below(6) as u32 + 1,
        Sport::Basketball => {
            if rng.chance(0.5) { 2 } else { 3 }
        }
        Sport::Soccer | Sport::Nfl => 1,
    }
}

fn random_side(rng: &mut dyn RandomSource) -> usize {
    if rng.chance(0.5) { 0 } else { 1 }
}

/// Advance a game by one clock unit. Returns the evolved game, or a brand
/// new fixture if the clock ran past regulation.
pub fn advance_game(game: &Game, rng: &mut dyn RandomSource) -> Game {
    let mut stats = game.stats.clone();
    stats.time += 1;

    if rng.chance(SCORE_EVENT_PROB) {
        let side = random_side(rng);
        stats.score[side] += score_points(game.sport, rng);
    }
    if rng.chance(CORNER_EVENT_PROB) {
        let side = random_side(rng);
        stats.corners[side] += 1;
    }
    if rng.chance(FOUL_EVENT_PROB) {
        let side = random_side(rng);
        stats.fouls[side] += 1;
    }

    if stats.time > game.sport.regulation_length() {
        debug!(game_id = %game.id, matchup = %game.matchup(), "Full time, replacing fixture");
        return generate_game(rng);
    }

    let odds = calculate_odds(game.sport, &stats);
    Game {
        stats,
        odds,
        ..game.clone()
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// The bounded set of live games.
#[derive(Debug, Clone, Default)]
pub struct GameSimulator {
    games: Vec<Game>,
}

impl GameSimulator {
    pub fn new(count: usize, rng: &mut dyn RandomSource) -> Self {
        Self {
            games: generate_live_games(count, rng),
        }
    }

    /// Build a simulator over a fixed set of games.
    pub fn from_games(games: Vec<Game>) -> Self {
        Self { games }
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    /// Pick a live game uniformly at random.
    pub fn random_game(&self, rng: &mut dyn RandomSource) -> Option<&Game> {
        if self.games.is_empty() {
            return None;
        }
        self.games.get(rng.below(self.games.len()))
    }

    /// Advance every game by one unit. Returns how many were replaced.
    pub fn tick(&mut self, rng: &mut dyn RandomSource) -> usize {
        let mut replaced = 0;
        for game in self.games.iter_mut() {
            let next = advance_game(game, rng);
            if next.id != game.id {
                replaced += 1;
            }
            *game = next;
        }
        replaced
    }
}
