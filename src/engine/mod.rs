//! Desk engine: shared state, the bot's timer loops, and delayed
//! settlement.

pub mod bot;
pub mod desk;
pub mod scheduler;

pub use bot::{BetBot, BotTiming};
pub use desk::{Desk, DeskSettings, DeskSnapshot, DeskSummary};
pub use scheduler::SettlementScheduler;
