//! Account and wallet flows against the persistent storage backends.

use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;

use betbot::account::AccountService;
use betbot::config::{AppConfig, StorageConfig};
use betbot::engine::BetBot;
use betbot::storage::{self, AccountRepository, KvAccountRepository};
use betbot::types::{BetBotError, PaymentMethod, Selection, TransactionKind};

use crate::mock_recommender::ScriptedRecommender;

fn temp_path(ext: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("betbot_it_{}.{ext}", uuid::Uuid::new_v4()));
    p
}

async fn desk_on(storage: &StorageConfig) -> (BetBot, Arc<KvAccountRepository>) {
    let mut cfg = AppConfig::default();
    cfg.simulation.seed = Some(11);
    cfg.storage = storage.clone();

    let store = storage::open_store(&cfg.storage).await.unwrap();
    let repo = Arc::new(KvAccountRepository::new(store));
    let accounts = Arc::new(AccountService::new(repo.clone(), cfg.desk.initial_balance));
    let recommender = Arc::new(ScriptedRecommender::always(Selection::Home, 99.0));
    (BetBot::from_config(&cfg, recommender, accounts), repo)
}

#[tokio::test]
async fn test_session_and_balance_survive_restart_json() {
    let path = temp_path("json");
    let storage = StorageConfig {
        backend: "json".into(),
        path: path.to_string_lossy().to_string(),
    };

    {
        let (bot, _) = desk_on(&storage).await;
        bot.register("Thandi", "thandi@example.com", "0821234567", "pw")
            .await
            .unwrap();
        bot.verify("thandi@example.com", "123456", "9001015009087")
            .await
            .unwrap();
        bot.deposit("1500", PaymentMethod::Ozow).await.unwrap();

        bot.set_bot_active(true).await;
        bot.run_scan_cycle().await.unwrap();
        assert_eq!(bot.balance().await, dec!(11000));
        bot.shutdown().await;
    }

    let (bot, repo) = desk_on(&storage).await;
    assert_eq!(bot.balance().await, dec!(10000));

    let user = bot.restore_session().await.unwrap().expect("session persisted");
    assert!(user.is_verified);
    assert_eq!(user.id_number.as_deref(), Some("9001015009087"));
    assert_eq!(bot.balance().await, dec!(11000));

    let txs = bot.transactions().await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].kind, TransactionKind::Deposit);
    assert_eq!(repo.users().await.unwrap().len(), 1);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_duplicate_registration_on_sqlite() {
    let path = temp_path("db");
    let storage = StorageConfig {
        backend: "sqlite".into(),
        path: path.to_string_lossy().to_string(),
    };

    let (bot, repo) = desk_on(&storage).await;
    let first = bot
        .register("A", "same@example.com", "1", "pw")
        .await
        .unwrap();
    bot.logout().await.unwrap();

    let err = bot
        .register("B", "same@example.com", "2", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, BetBotError::DuplicateUser));

    let users = repo.users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, first.id);
    assert!(repo.session_user_id().await.unwrap().is_none());

    drop(bot);
    drop(repo);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_withdrawal_cannot_touch_funds_at_risk() {
    let storage = StorageConfig {
        backend: "memory".into(),
        path: String::new(),
    };
    let (bot, _) = desk_on(&storage).await;
    bot.register("A", "a@example.com", "1", "pw").await.unwrap();
    bot.set_stake(dec!(4000)).await.unwrap();
    bot.set_bot_active(true).await;
    bot.run_scan_cycle().await.unwrap();

    let err = bot.withdraw("7000").await.unwrap_err();
    assert!(matches!(err, BetBotError::InsufficientBalance { .. }));

    let receipt = bot.withdraw("6000").await.unwrap();
    assert_eq!(receipt.balance, dec!(0));
    assert_eq!(bot.summary().await.funds_at_risk, dec!(4000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_registrations_on_sqlite_keep_emails_unique() {
    let storage = StorageConfig {
        backend: "sqlite".into(),
        path: ":memory:".into(),
    };
    let store = storage::open_store(&storage).await.unwrap();
    let repo = Arc::new(KvAccountRepository::new(store));
    let accounts = Arc::new(AccountService::new(repo.clone(), dec!(10000)));

    let mut admitted = 0;
    for round in 0..20 {
        let email = format!("racer{round}@example.com");
        let pair: Vec<_> = (0..2)
            .map(|_| {
                let accounts = accounts.clone();
                let email = email.clone();
                tokio::spawn(async move { accounts.register("Racer", &email, "1", "pw").await })
            })
            .collect();
        for task in pair {
            match task.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(e) => assert!(matches!(e, BetBotError::DuplicateUser)),
            }
        }
    }

    assert_eq!(admitted, 20);
    let users = repo.users().await.unwrap();
    assert_eq!(users.len(), 20);
    let mut emails: Vec<_> = users.iter().map(|u| u.email.clone()).collect();
    emails.sort();
    emails.dedup();
    assert_eq!(emails.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_balance_sync_does_not_drop_concurrent_registrations() {
    let storage = StorageConfig {
        backend: "memory".into(),
        path: String::new(),
    };
    let store = storage::open_store(&storage).await.unwrap();
    let repo = Arc::new(KvAccountRepository::new(store));
    let accounts = Arc::new(AccountService::new(repo.clone(), dec!(10000)));
    accounts.register("Owner", "owner@example.com", "1", "pw").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let a = accounts.clone();
        tasks.push(tokio::spawn(async move {
            a.register("New", &format!("new{i}@example.com"), "1", "pw")
                .await
                .map(|_| ())
        }));
        let a = accounts.clone();
        tasks.push(tokio::spawn(async move {
            a.sync_balance(dec!(9000) + rust_decimal::Decimal::from(i)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(repo.users().await.unwrap().len(), 21);
}
