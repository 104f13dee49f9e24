//! End-to-end desk simulation.
//!
//! Drives a seeded desk through scan cycles, settlements and game ticks
//! and checks the balance and simulator invariants along the way.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use betbot::account::AccountService;
use betbot::config::AppConfig;
use betbot::engine::BetBot;
use betbot::storage::{self, KvAccountRepository};
use betbot::types::{payout, BetStatus, LogKind, Selection};

use crate::mock_recommender::ScriptedRecommender;

fn config(seed: u64) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.simulation.seed = Some(seed);
    cfg.storage.backend = "memory".into();
    cfg
}

async fn active_desk(cfg: &AppConfig, recommender: Arc<ScriptedRecommender>) -> BetBot {
    let store = storage::open_store(&cfg.storage).await.unwrap();
    let repo = Arc::new(KvAccountRepository::new(store));
    let accounts = Arc::new(AccountService::new(repo, cfg.desk.initial_balance));
    let bot = BetBot::from_config(cfg, recommender, accounts);
    bot.set_bot_active(true).await;
    bot
}

#[tokio::test(start_paused = true)]
async fn test_home_pick_at_ninety_percent() {
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Home, 90.0));
    let bot = active_desk(&config(1), recommender.clone()).await;

    let bet = bot.run_scan_cycle().await.expect("position should open");
    let games = bot.games().await;
    let game = games.iter().find(|g| g.id == bet.game_id).unwrap();

    assert_eq!(recommender.calls(), vec![game.id.clone()]);
    assert_eq!(bet.selection, Selection::Home);
    assert_eq!(bet.odds, game.odds.home);
    assert_eq!(bet.amount, dec!(500));
    assert_eq!(bot.balance().await, dec!(9500));

    tokio::time::sleep(Duration::from_secs(16)).await;

    let balance = bot.balance().await;
    let won = dec!(9500) + payout(dec!(500), bet.odds);
    assert!(balance == dec!(9500) || balance == won, "unexpected balance {balance}");

    let snapshot = bot.snapshot().await;
    let settled = &snapshot.bets[0];
    assert_ne!(settled.status, BetStatus::Open);
    assert_eq!(settled.status == BetStatus::Won, balance == won);
    assert!(settled.settled_at.is_some());
}

#[tokio::test]
async fn test_confidence_eighty_never_bets() {
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Home, 80.0));
    let bot = active_desk(&config(2), recommender.clone()).await;

    for _ in 0..5 {
        assert!(bot.run_scan_cycle().await.is_none());
    }
    assert_eq!(recommender.calls().len(), 5);
    assert_eq!(bot.balance().await, dec!(10000));
    assert!(bot.snapshot().await.bets.is_empty());
}

#[tokio::test]
async fn test_skip_never_bets_even_when_confident() {
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Skip, 99.0));
    let bot = active_desk(&config(3), recommender).await;

    assert!(bot.run_scan_cycle().await.is_none());
    assert_eq!(bot.balance().await, dec!(10000));
}

#[tokio::test]
async fn test_stake_capped_and_balance_never_negative() {
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Away, 99.0));
    let bot = active_desk(&config(4), recommender).await;
    bot.set_stake(dec!(3000)).await.unwrap();

    let mut stakes = Vec::new();
    for _ in 0..6 {
        if let Some(bet) = bot.run_scan_cycle().await {
            stakes.push(bet.amount);
        }
        assert!(bot.balance().await >= Decimal::ZERO);
    }

    assert_eq!(stakes, vec![dec!(3000), dec!(3000), dec!(3000), dec!(1000)]);
    assert_eq!(bot.balance().await, Decimal::ZERO);

    let snapshot = bot.snapshot().await;
    assert_eq!(snapshot.summary.funds_at_risk, dec!(10000));
    assert_eq!(snapshot.summary.total_equity, dec!(10000));
    assert!(snapshot
        .logs
        .iter()
        .any(|l| l.kind == LogKind::Warning && l.message.contains("Insufficient balance")));
}

#[tokio::test]
async fn test_recommender_failure_fails_closed() {
    let recommender = Arc::new(ScriptedRecommender::failing("upstream timeout"));
    let bot = active_desk(&config(5), recommender.clone()).await;

    assert!(bot.run_scan_cycle().await.is_none());
    assert!(bot.run_scan_cycle().await.is_none());
    assert_eq!(recommender.calls().len(), 2);

    let snapshot = bot.snapshot().await;
    assert!(!snapshot.analyzing);
    assert!(snapshot.bets.is_empty());
    assert_eq!(
        snapshot.logs.iter().filter(|l| l.kind == LogKind::Error).count(),
        2
    );
}

#[tokio::test]
async fn test_queued_response_then_default() {
    let recommender = Arc::new(
        ScriptedRecommender::always(Selection::Home, 50.0).then(Selection::Away, 92.0),
    );
    let bot = active_desk(&config(6), recommender).await;

    let first = bot.run_scan_cycle().await.unwrap();
    assert_eq!(first.selection, Selection::Away);
    assert!(bot.run_scan_cycle().await.is_none());
}

#[tokio::test]
async fn test_long_run_simulator_invariants() {
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Skip, 0.0));
    let bot = active_desk(&config(7), recommender).await;

    for _ in 0..400 {
        bot.tick_games().await;
        let games = bot.games().await;
        assert_eq!(games.len(), 10);
        for game in &games {
            let s = &game.stats;
            assert_eq!(s.possession[0] + s.possession[1], 100);
            assert!(s.time <= game.sport.regulation_length());
            assert!((1.01..=50.0).contains(&game.odds.home), "{game}");
            assert!((1.01..=50.0).contains(&game.odds.away), "{game}");
            assert_eq!(game.odds.draw.is_some(), game.sport.has_draw());
            if let Some(draw) = game.odds.draw {
                assert!(draw >= 1.1);
            }
            assert_ne!(game.home_team, game.away_team);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_timers_drive_the_desk() {
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Home, 95.0));
    let bot = active_desk(&config(8), recommender.clone()).await;
    bot.start();

    // Scans at 10s, 20s and 30s; the first settles at 25s.
    tokio::time::sleep(Duration::from_secs(31)).await;

    let snapshot = bot.snapshot().await;
    assert_eq!(recommender.calls().len(), 3);
    assert_eq!(snapshot.bets.len(), 3);
    assert_eq!(snapshot.history.len(), 4);
    assert_eq!(
        snapshot.bets.iter().filter(|b| b.status != BetStatus::Open).count(),
        1
    );
    assert_eq!(
        snapshot.summary.total_equity,
        snapshot.balance + snapshot.summary.funds_at_risk
    );
    assert_eq!(bot.pending_settlements(), 2);

    bot.shutdown().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    let after = bot.snapshot().await;
    assert_eq!(recommender.calls().len(), 3);
    assert_eq!(after.balance, snapshot.balance);
    assert_eq!(after.summary.open_positions, 2);
}

#[tokio::test]
async fn test_seeded_desks_generate_identical_games() {
    let a = active_desk(&config(42), Arc::new(ScriptedRecommender::always(Selection::Skip, 0.0))).await;
    let b = active_desk(&config(42), Arc::new(ScriptedRecommender::always(Selection::Skip, 0.0))).await;

    let (ga, gb) = (a.games().await, b.games().await);
    let teams = |games: &[betbot::types::Game]| {
        games
            .iter()
            .map(|g| (g.home_team.clone(), g.away_team.clone(), g.stats.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(teams(&ga), teams(&gb));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_scans_share_one_request() {
    let recommender = Arc::new(
        ScriptedRecommender::always(Selection::Home, 95.0).with_latency(Duration::from_secs(5)),
    );
    let bot = active_desk(&config(9), recommender.clone()).await;

    let scans: Vec<_> = (0..5)
        .map(|_| {
            let bot = bot.clone();
            tokio::spawn(async move { bot.run_scan_cycle().await })
        })
        .collect();

    let mut opened = 0;
    for scan in scans {
        if scan.await.unwrap().is_some() {
            opened += 1;
        }
    }

    assert_eq!(opened, 1);
    assert_eq!(recommender.calls().len(), 1);
    assert_eq!(recommender.peak_in_flight(), 1);
    assert!(!bot.snapshot().await.analyzing);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_scan_releases_slot_when_request_ends() {
    let recommender = Arc::new(
        ScriptedRecommender::always(Selection::Home, 95.0).with_latency(Duration::from_secs(5)),
    );
    let bot = active_desk(&config(10), recommender.clone()).await;

    let abandoned = tokio::time::timeout(Duration::from_secs(1), bot.run_scan_cycle()).await;
    assert!(abandoned.is_err());

    // Still in flight: a second request must not start.
    assert!(bot.snapshot().await.analyzing);
    assert!(bot.run_scan_cycle().await.is_none());
    assert_eq!(recommender.calls().len(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snapshot = bot.snapshot().await;
    assert!(!snapshot.analyzing);
    assert_eq!(recommender.in_flight(), 0);
    assert_eq!(snapshot.bets.len(), 1);

    let next = bot.run_scan_cycle().await.expect("slot released");
    assert_eq!(next.amount, dec!(500));
    assert_eq!(recommender.calls().len(), 2);
    assert_eq!(recommender.peak_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_request_leaves_bot_usable() {
    let recommender = Arc::new(
        ScriptedRecommender::always(Selection::Home, 95.0).with_latency(Duration::from_secs(5)),
    );
    let bot = active_desk(&config(11), recommender.clone()).await;
    bot.start();

    // The scan that starts at 10s is still waiting on its answer.
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(recommender.in_flight(), 1);

    bot.shutdown().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = bot.snapshot().await;
    assert!(!snapshot.analyzing);
    assert!(!snapshot.bot_active);
    assert!(snapshot.bets.is_empty());
    assert!(snapshot
        .logs
        .iter()
        .any(|l| l.kind == LogKind::Warning && l.message.contains("result discarded")));

    bot.set_bot_active(true).await;
    assert!(bot.run_scan_cycle().await.is_some());
    assert_eq!(recommender.calls().len(), 2);
    assert_eq!(recommender.peak_in_flight(), 1);
}
