//! Game simulation: fixture generation, per-tick evolution, and the
//! synthetic odds model.

pub mod catalog;
pub mod odds;
pub mod random;
pub mod simulator;

pub use odds::calculate_odds;
pub use random::{RandomSource, ScriptedRandom, StdRandom};
pub use simulator::GameSimulator;
