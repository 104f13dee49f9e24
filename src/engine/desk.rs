//! Desk state: live games, positions, balance, console log and equity
//! history.
//!
//! Everything here is synchronous. The async orchestration in
//! [`super::bot`] takes the write lock, calls one of these transitions,
//! and releases it. All randomness flows through the desk's
//! `RandomSource`.

use chrono::Utc;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::sim::{GameSimulator, RandomSource};
use crate::types::{
    BalancePoint, Bet, BetBotError, BetStatus, BotLog, Game, LogKind, Recommendation,
};

/// Console entries kept in memory.
pub const MAX_LOGS: usize = 50;
/// Equity samples kept in memory.
pub const MAX_HISTORY: usize = 20;
/// Settled bets shown in the streak.
const STREAK_LEN: usize = 10;

/// Static desk parameters.
#[derive(Debug, Clone)]
pub struct DeskSettings {
    pub initial_balance: Decimal,
    pub stake: Decimal,
    pub confidence_threshold: f64,
    pub currency: String,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::from(10_000),
            stake: Decimal::from(500),
            confidence_threshold: 85.0,
            currency: "R".into(),
        }
    }
}

/// Aggregate figures for the portfolio view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskSummary {
    pub balance: Decimal,
    /// Sum of open stakes.
    pub funds_at_risk: Decimal,
    /// Balance plus funds at risk.
    pub total_equity: Decimal,
    /// Balance minus the initial balance.
    pub profit_loss: Decimal,
    pub open_positions: usize,
    pub win_count: usize,
    pub loss_count: usize,
    /// Percentage of settled bets won, 0 when nothing has settled.
    pub win_rate: f64,
    /// Latest settled statuses, newest first.
    pub recent_streak: Vec<BetStatus>,
}

/// Point-in-time copy of the desk for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DeskSnapshot {
    pub games: Vec<Game>,
    pub bets: Vec<Bet>,
    pub logs: Vec<BotLog>,
    pub history: Vec<BalancePoint>,
    pub balance: Decimal,
    pub stake: Decimal,
    pub currency: String,
    pub bot_active: bool,
    pub analyzing: bool,
    pub summary: DeskSummary,
}

pub struct Desk {
    settings: DeskSettings,
    simulator: GameSimulator,
    /// Newest first.
    bets: Vec<Bet>,
    /// Oldest first.
    logs: VecDeque<BotLog>,
    /// Oldest first.
    history: VecDeque<BalancePoint>,
    balance: Decimal,
    stake: Decimal,
    bot_active: bool,
    analyzing: bool,
    rng: Box<dyn RandomSource>,
}

impl Desk {
    pub fn new(settings: DeskSettings, simulator: GameSimulator, rng: Box<dyn RandomSource>) -> Self {
        let balance = settings.initial_balance;
        let stake = settings.stake;
        let mut desk = Self {
            settings,
            simulator,
            bets: Vec::new(),
            logs: VecDeque::with_capacity(MAX_LOGS),
            history: VecDeque::with_capacity(MAX_HISTORY),
            balance,
            stake,
            bot_active: false,
            analyzing: false,
            rng,
        };
        desk.record_equity();
        desk.log(
            format!("BetBot desk initialised with {} live games.", desk.simulator.games().len()),
            LogKind::Info,
        );
        desk
    }

    // -- Accessors ----------------------------------------------------------

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn stake(&self) -> Decimal {
        self.stake
    }

    pub fn is_bot_active(&self) -> bool {
        self.bot_active
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn games(&self) -> &[Game] {
        self.simulator.games()
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn bet(&self, id: &str) -> Option<&Bet> {
        self.bets.iter().find(|b| b.id == id)
    }

    pub fn open_bets(&self) -> impl Iterator<Item = &Bet> {
        self.bets.iter().filter(|b| b.is_open())
    }

    pub fn logs(&self) -> impl Iterator<Item = &BotLog> {
        self.logs.iter()
    }

    pub fn history(&self) -> impl Iterator<Item = &BalancePoint> {
        self.history.iter()
    }

    pub fn settings(&self) -> &DeskSettings {
        &self.settings
    }

    // -- Console ------------------------------------------------------------

    /// Append a console entry, dropping the oldest past `MAX_LOGS`.
    /// Mirrored to tracing at the matching level.
    pub fn log(&mut self, message: impl Into<String>, kind: LogKind) {
        let message = message.into();
        match kind {
            LogKind::Error => error!(target: "betbot::desk", "{message}"),
            LogKind::Warning => warn!(target: "betbot::desk", "{message}"),
            LogKind::Info | LogKind::Success | LogKind::Ai => {
                info!(target: "betbot::desk", kind = ?kind, "{message}")
            }
        }
        self.logs.push_back(BotLog {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            message,
            kind,
        });
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    // -- Controls -----------------------------------------------------------

    pub fn set_bot_active(&mut self, active: bool) {
        if self.bot_active == active {
            return;
        }
        self.bot_active = active;
        if active {
            self.log("Bot activated. Scanning live markets.", LogKind::Info);
        } else {
            self.log("Bot paused.", LogKind::Warning);
        }
    }

    pub fn set_stake(&mut self, stake: Decimal) -> Result<Decimal, BetBotError> {
        if stake <= Decimal::ZERO {
            return Err(BetBotError::InvalidStake(format!("{stake} must be greater than zero")));
        }
        self.stake = stake;
        let message = format!("Stake set to {}{stake}.", self.settings.currency);
        self.log(message, LogKind::Info);
        Ok(stake)
    }

    /// Set the stake to `percent`% of the current balance, rounded down.
    pub fn set_stake_percent(&mut self, percent: u32) -> Result<Decimal, BetBotError> {
        if percent == 0 || percent > 100 {
            return Err(BetBotError::InvalidStake(format!("{percent}% is outside 1..=100")));
        }
        let stake = (self.balance * Decimal::from(percent) / Decimal::ONE_HUNDRED).floor();
        self.set_stake(stake)
    }

    /// Replace the balance wholesale (session switch, wallet operation).
    pub fn set_balance(&mut self, balance: Decimal) {
        debug!(from = %self.balance, to = %balance, "Balance replaced");
        self.balance = balance;
    }

    // -- Simulation ---------------------------------------------------------

    /// Advance every live game one clock unit.
    pub fn tick_games(&mut self) -> usize {
        let replaced = self.simulator.tick(self.rng.as_mut());
        if replaced > 0 {
            debug!(replaced, "Fixtures replaced at full time");
        }
        replaced
    }

    /// Append the current balance to the equity history.
    pub fn record_equity(&mut self) {
        self.history.push_back(BalancePoint {
            timestamp: Utc::now(),
            balance: self.balance,
        });
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    // -- Bot cycle ----------------------------------------------------------

    /// Claim the in-flight slot and pick a game to analyse. `None` when the
    /// bot is paused, a request is already in flight, or there are no
    /// games.
    pub fn begin_scan(&mut self) -> Option<Game> {
        if !self.bot_active || self.analyzing {
            return None;
        }
        let game = self.simulator.random_game(self.rng.as_mut())?.clone();
        self.analyzing = true;
        self.log(
            format!("Global Scan: Analyzing {} - {}...", game.league, game.matchup()),
            LogKind::Info,
        );
        Some(game)
    }

    /// Release the in-flight slot and act on the recommendation for the
    /// snapshot handed out by `begin_scan`.
    pub fn finish_scan(
        &mut self,
        game: &Game,
        outcome: anyhow::Result<Recommendation>,
    ) -> Option<Bet> {
        self.analyzing = false;

        let rec = match outcome {
            Ok(rec) => rec,
            Err(e) => {
                self.log(format!("Critical: AI inference failed ({e:#})."), LogKind::Error);
                return None;
            }
        };

        if !self.bot_active {
            self.log(
                format!("Bot paused during analysis of {}; result discarded.", game.matchup()),
                LogKind::Warning,
            );
            return None;
        }

        if !rec.is_actionable(self.settings.confidence_threshold) {
            self.log(
                format!(
                    "Market Scan [{}]: No Edge Found ({} @ {:.0}%).",
                    game.league, rec.recommendation, rec.confidence
                ),
                LogKind::Warning,
            );
            return None;
        }

        self.open_position(game, &rec)
    }

    /// Open a position on `game` at its snapshot price. Debits the stake
    /// immediately. The stake is capped at the available balance.
    pub fn open_position(&mut self, game: &Game, rec: &Recommendation) -> Option<Bet> {
        let stake = self.stake.min(self.balance);
        if stake <= Decimal::ZERO {
            self.log("Warning: Bot position skipped. Insufficient balance.", LogKind::Warning);
            return None;
        }

        let Some(price) = game.price_for(rec.recommendation) else {
            self.log(
                format!("No {} market on {}; position skipped.", rec.recommendation, game.matchup()),
                LogKind::Warning,
            );
            return None;
        };

        self.log(
            format!(
                "AI DETECTED EDGE: {} | Confidence: {:.0}%",
                rec.recommendation, rec.confidence
            ),
            LogKind::Ai,
        );
        self.log(format!("Logic: {}", rec.reasoning), LogKind::Ai);

        let bet = Bet {
            id: Uuid::new_v4().to_string(),
            game_id: game.id.clone(),
            matchup: game.matchup(),
            selection: rec.recommendation,
            amount: stake,
            odds: price,
            confidence: rec.confidence,
            status: BetStatus::Open,
            timestamp: Utc::now(),
            settled_at: None,
        };

        self.balance -= stake;
        self.bets.insert(0, bet.clone());
        self.log(
            format!(
                "Position opened: {}{} on {} @ {:.2}.",
                self.settings.currency, stake, bet.selection, price
            ),
            LogKind::Success,
        );
        Some(bet)
    }

    /// Settle an open bet with a weighted coin flip on its confidence.
    /// `None` if the bet is unknown or already settled.
    pub fn resolve_bet(&mut self, bet_id: &str) -> Option<Bet> {
        let idx = self.bets.iter().position(|b| b.id == bet_id && b.is_open())?;
        let won = self.rng.chance(self.bets[idx].win_probability());

        let credit = match self.bets[idx].settle(won) {
            Ok(credit) => credit,
            Err(e) => {
                self.log(format!("Settlement rejected: {e}"), LogKind::Error);
                return None;
            }
        };
        self.balance += credit;

        let bet = self.bets[idx].clone();
        if won {
            let message = format!(
                "WIN: Position {} closed for {}{}.",
                bet.id, self.settings.currency, credit
            );
            self.log(message, LogKind::Success);
        } else {
            self.log(format!("LOSS: Position {} hit stop-loss.", bet.id), LogKind::Error);
        }
        Some(bet)
    }

    // -- Presentation -------------------------------------------------------

    pub fn summary(&self) -> DeskSummary {
        let funds_at_risk: Decimal = self.open_bets().map(|b| b.amount).sum();
        let open_positions = self.open_bets().count();
        let win_count = self.bets.iter().filter(|b| b.status == BetStatus::Won).count();
        let loss_count = self.bets.iter().filter(|b| b.status == BetStatus::Lost).count();
        let settled = win_count + loss_count;
        let win_rate = if settled == 0 {
            0.0
        } else {
            win_count as f64 / settled as f64 * 100.0
        };
        let recent_streak = self
            .bets
            .iter()
            .filter(|b| !b.is_open())
            .take(STREAK_LEN)
            .map(|b| b.status)
            .collect();

        DeskSummary {
            balance: self.balance,
            funds_at_risk,
            total_equity: self.balance + funds_at_risk,
            profit_loss: self.balance - self.settings.initial_balance,
            open_positions,
            win_count,
            loss_count,
            win_rate,
            recent_streak,
        }
    }

    pub fn snapshot(&self) -> DeskSnapshot {
        DeskSnapshot {
            games: self.simulator.games().to_vec(),
            bets: self.bets.clone(),
            logs: self.logs.iter().cloned().collect(),
            history: self.history.iter().cloned().collect(),
            balance: self.balance,
            stake: self.stake,
            currency: self.settings.currency.clone(),
            bot_active: self.bot_active,
            analyzing: self.analyzing,
            summary: self.summary(),
        }
    }
}
