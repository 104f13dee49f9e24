//! BETBOT — simulated live sports-betting desk.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the account store, restores the last session, starts the desk
//! timers and the dashboard, and shuts everything down on Ctrl+C.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use betbot::account::AccountService;
use betbot::config::AppConfig;
use betbot::dashboard;
use betbot::engine::BetBot;
use betbot::llm;
use betbot::storage::{self, KvAccountRepository};

const BANNER: &str = r#"
 ____  _____ _____ ____   ___ _____
| __ )| ____|_   _| __ ) / _ \_   _|
|  _ \|  _|   | | |  _ \| | | || |
| |_) | |___  | | | |_) | |_| || |
|____/|_____| |_| |____/ \___/ |_|

  Simulated live betting desk
  v0.1.0
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("BETBOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        AppConfig::default()
    };

    println!("{BANNER}");
    info!(
        desk = %cfg.desk.name,
        initial_balance = %cfg.desk.initial_balance,
        currency = %cfg.desk.currency,
        games = cfg.simulation.game_count,
        stake = %cfg.bot.stake,
        "BETBOT starting up"
    );

    // -- Components ------------------------------------------------------

    let store = storage::open_store(&cfg.storage).await?;
    let repo = Arc::new(KvAccountRepository::new(store));
    let accounts = Arc::new(AccountService::new(repo, cfg.desk.initial_balance));

    let recommender = llm::build_recommender(&cfg.llm, cfg.llm_api_key())?;

    let bot = BetBot::from_config(&cfg, recommender, accounts);
    match bot.restore_session().await {
        Ok(Some(user)) => info!(user_id = %user.id, balance = %user.balance, "Resumed session"),
        Ok(None) => info!("No active session, starting with the initial balance"),
        Err(e) => warn!(error = %e, "Could not restore session"),
    }

    bot.start();

    let server = if cfg.dashboard.enabled {
        Some(dashboard::spawn_dashboard(bot.clone(), cfg.dashboard.port).await?)
    } else {
        None
    };

    // -- Run until Ctrl+C --------------------------------------------------

    info!("Desk running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    bot.shutdown().await;
    if let Some(server) = server {
        server.abort();
    }

    let usage = bot.recommender_usage();
    info!(
        model = %usage.model,
        calls = usage.calls,
        cost = format!("${:.4}", usage.cost_usd),
        "Recommender usage"
    );

    let summary = bot.summary().await;
    info!(
        balance = %summary.balance,
        equity = %summary.total_equity,
        pnl = %summary.profit_loss,
        won = summary.win_count,
        lost = summary.loss_count,
        win_rate = format!("{:.1}%", summary.win_rate),
        "BETBOT shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("betbot=info"));

    let json_logging = std::env::var("BETBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
