//! Shared types for the BETBOT desk.
//!
//! These types form the data model used across all modules: simulated
//! games and their odds, bot positions, logs, and the account/wallet
//! records kept in the persistence layer.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Sport
// ---------------------------------------------------------------------------

/// Sports covered by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    Soccer,
    Rugby,
    Cricket,
    Basketball,
    #[serde(rename = "NFL")]
    Nfl,
}

impl Sport {
    /// All known sports (useful for iteration and random picks).
    pub const ALL: &'static [Sport] = &[
        Sport::Soccer,
        Sport::Basketball,
        Sport::Rugby,
        Sport::Cricket,
        Sport::Nfl,
    ];

    /// Elapsed-time threshold after which a live game is finished.
    ///
    /// Cricket and NFL run on a generic 100-unit clock.
    pub fn regulation_length(&self) -> u32 {
        match self {
            Sport::Soccer => 90,
            Sport::Rugby => 80,
            Sport::Basketball => 48,
            Sport::Cricket | Sport::Nfl => 100,
        }
    }

    /// Probability mass reserved for the house when normalising prices.
    pub fn overround(&self) -> f64 {
        match self {
            Sport::Soccer => 0.2,
            _ => 0.1,
        }
    }

    /// Score gap under which a draw is still considered live.
    /// `None` for sports without a draw market.
    pub fn draw_closeness(&self) -> Option<u32> {
        match self {
            Sport::Soccer => Some(2),
            Sport::Rugby => Some(7),
            _ => None,
        }
    }

    pub fn has_draw(&self) -> bool {
        self.draw_closeness().is_some()
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Soccer => write!(f, "Soccer"),
            Sport::Rugby => write!(f, "Rugby"),
            Sport::Cricket => write!(f, "Cricket"),
            Sport::Basketball => write!(f, "Basketball"),
            Sport::Nfl => write!(f, "NFL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

/// Live match statistics. Index 0 is the home side, index 1 the away side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub score: [u32; 2],
    /// Always sums to 100.
    pub possession: [u32; 2],
    pub shots: [u32; 2],
    pub yellow_cards: [u32; 2],
    pub corners: [u32; 2],
    pub fouls: [u32; 2],
    /// Aggregate player form index, 0–10.
    pub player_form: [f64; 2],
    /// Elapsed time in the sport's native unit.
    pub time: u32,
}

impl GameStats {
    /// Home score minus away score.
    pub fn score_diff(&self) -> i64 {
        i64::from(self.score[0]) - i64::from(self.score[1])
    }
}

/// Three-way price for a game. Draw is only offered for soccer and rugby.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    pub home: f64,
    pub away: f64,
    pub draw: Option<f64>,
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Home({:.2}), Away({:.2})", self.home, self.away)?;
        if let Some(d) = self.draw {
            write!(f, ", Draw({d:.2})")?;
        }
        Ok(())
    }
}

/// Lifecycle of a fixture. The simulator only ever exposes live games;
/// one that runs past regulation is replaced rather than finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    Live,
}

/// A simulated live game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub sport: Sport,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub odds: Odds,
    pub stats: GameStats,
    #[serde(default)]
    pub status: GameStatus,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} | {}] {} {}-{} {} ({}') {}",
            self.sport,
            self.league,
            self.home_team,
            self.stats.score[0],
            self.stats.score[1],
            self.away_team,
            self.stats.time,
            self.odds,
        )
    }
}

impl Game {
    /// Human-readable matchup label, e.g. "Arsenal vs Chelsea".
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    /// Current price for a selection. `None` for SKIP, or DRAW on a
    /// sport without a draw market.
    pub fn price_for(&self, selection: Selection) -> Option<f64> {
        match selection {
            Selection::Home => Some(self.odds.home),
            Selection::Away => Some(self.odds.away),
            Selection::Draw => self.odds.draw,
            Selection::Skip => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// Side picked by the recommendation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Selection {
    Home,
    Away,
    Draw,
    Skip,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Home => write!(f, "HOME"),
            Selection::Away => write!(f, "AWAY"),
            Selection::Draw => write!(f, "DRAW"),
            Selection::Skip => write!(f, "SKIP"),
        }
    }
}

impl std::str::FromStr for Selection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HOME" => Ok(Selection::Home),
            "AWAY" => Ok(Selection::Away),
            "DRAW" => Ok(Selection::Draw),
            "SKIP" => Ok(Selection::Skip),
            other => anyhow::bail!("Unknown selection: {other}"),
        }
    }
}

/// A betting recommendation for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 0–100.
    pub confidence: f64,
    pub reasoning: String,
    pub recommendation: Selection,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:.0}% | {}",
            self.recommendation, self.confidence, self.reasoning
        )
    }
}

impl Recommendation {
    /// The fail-closed recommendation.
    pub fn skip(reasoning: impl Into<String>) -> Self {
        Self {
            confidence: 0.0,
            reasoning: reasoning.into(),
            recommendation: Selection::Skip,
        }
    }

    /// Whether the bot should act on this recommendation.
    pub fn is_actionable(&self, threshold: f64) -> bool {
        self.recommendation != Selection::Skip && self.confidence >= threshold
    }
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetStatus {
    Open,
    Won,
    Lost,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Open => write!(f, "OPEN"),
            BetStatus::Won => write!(f, "WON"),
            BetStatus::Lost => write!(f, "LOST"),
        }
    }
}

/// A simulated position opened by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub game_id: String,
    pub matchup: String,
    pub selection: Selection,
    pub amount: Decimal,
    pub odds: f64,
    /// 0–100, fixed at open time.
    pub confidence: f64,
    pub status: BetStatus,
    pub timestamp: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} @ {:.2} stake={} conf={:.0}% [{}]",
            self.id, self.selection, self.matchup, self.odds, self.amount, self.confidence, self.status,
        )
    }
}

impl Bet {
    pub fn is_open(&self) -> bool {
        self.status == BetStatus::Open
    }

    /// Chance of winning at settlement: the open-time confidence as a
    /// fraction.
    pub fn win_probability(&self) -> f64 {
        (self.confidence / 100.0).clamp(0.0, 1.0)
    }

    /// Move an open bet to its terminal status and return the amount to
    /// credit. Settling a bet twice is an error.
    pub fn settle(&mut self, won: bool) -> Result<Decimal, BetBotError> {
        if !self.is_open() {
            return Err(BetBotError::AlreadySettled(self.id.clone()));
        }
        self.status = if won { BetStatus::Won } else { BetStatus::Lost };
        self.settled_at = Some(Utc::now());
        Ok(if won { payout(self.amount, self.odds) } else { Decimal::ZERO })
    }
}

/// Amount credited for a winning bet: floor(stake × price).
pub fn payout(stake: Decimal, price: f64) -> Decimal {
    let price = Decimal::from_f64(price).unwrap_or(Decimal::ONE);
    (stake * price).floor()
}

// ---------------------------------------------------------------------------
// Desk log & equity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
    Ai,
}

/// One line of the bot console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub kind: LogKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub timestamp: DateTime<Utc>,
    pub balance: Decimal,
}

// ---------------------------------------------------------------------------
// Accounts & wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub id_number: Option<String>,
    pub balance: Decimal,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "Deposit"),
            TransactionKind::Withdrawal => write!(f, "Withdrawal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

/// Payment rails offered by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Ozow,
    PayFast,
    #[serde(rename = "EFT")]
    Eft,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
}

impl std::str::FromStr for PaymentMethod {
    type Err = BetBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ozow" => Ok(PaymentMethod::Ozow),
            "payfast" => Ok(PaymentMethod::PayFast),
            "eft" => Ok(PaymentMethod::Eft),
            "bank transfer" | "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(BetBotError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Ozow => write!(f, "Ozow"),
            PaymentMethod::PayFast => write!(f, "PayFast"),
            PaymentMethod::Eft => write!(f, "EFT"),
            PaymentMethod::BankTransfer => write!(f, "Bank Transfer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// User-facing errors surfaced to the action that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum BetBotError {
    #[error("User already exists with this email.")]
    DuplicateUser,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("User not found.")]
    UserNotFound,

    #[error("Invalid verification code. Please try again.")]
    InvalidVerificationCode,

    #[error("Invalid South African ID. Must be exactly 13 digits.")]
    InvalidIdNumber,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid stake: {0}")]
    InvalidStake(String),

    #[error("Unsupported payment method: {0}")]
    InvalidPaymentMethod(String),

    #[error("Insufficient balance: need R{requested}, have R{available}")]
    InsufficientBalance { requested: Decimal, available: Decimal },

    #[error("No active session.")]
    NotAuthenticated,

    #[error("Bet already settled: {0}")]
    AlreadySettled(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
