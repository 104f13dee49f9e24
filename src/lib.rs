//! BETBOT — simulated live sports-betting desk.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod account;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod llm;
pub mod sim;
pub mod storage;
pub mod types;
