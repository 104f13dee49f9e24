//! Bot orchestrator.
//!
//! Owns the shared desk and drives it from timers: a game tick, a scan
//! cycle that asks the recommender about one random game, an equity
//! sampler, and one delayed settlement task per opened bet. Also the
//! entry point for every user action (bot controls, session, wallet).

use rust_decimal::Decimal;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::desk::{Desk, DeskSettings, DeskSnapshot, DeskSummary};
use super::scheduler::SettlementScheduler;
use crate::account::wallet::WalletReceipt;
use crate::account::AccountService;
use crate::config::AppConfig;
use crate::llm::{Recommender, RecommenderUsage};
use crate::sim::{GameSimulator, RandomSource, StdRandom};
use crate::types::{Bet, BetBotError, Game, LogKind, PaymentMethod, Transaction, User};

/// Timer periods.
#[derive(Debug, Clone, Copy)]
pub struct BotTiming {
    pub tick_interval: Duration,
    pub scan_interval: Duration,
    pub equity_interval: Duration,
    pub resolve_delay: Duration,
}

impl Default for BotTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            scan_interval: Duration::from_secs(10),
            equity_interval: Duration::from_secs(10),
            resolve_delay: Duration::from_secs(15),
        }
    }
}

impl BotTiming {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            tick_interval: Duration::from_secs(cfg.simulation.tick_interval_secs),
            scan_interval: Duration::from_secs(cfg.bot.scan_interval_secs),
            equity_interval: Duration::from_secs(cfg.bot.equity_interval_secs),
            resolve_delay: Duration::from_secs(cfg.bot.resolve_delay_secs),
        }
    }
}

#[derive(Clone)]
pub struct BetBot {
    desk: Arc<RwLock<Desk>>,
    recommender: Arc<dyn Recommender>,
    accounts: Arc<AccountService>,
    scheduler: Arc<SettlementScheduler>,
    timing: BotTiming,
    timers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BetBot {
    pub fn new(
        desk: Desk,
        recommender: Arc<dyn Recommender>,
        accounts: Arc<AccountService>,
        timing: BotTiming,
    ) -> Self {
        Self {
            desk: Arc::new(RwLock::new(desk)),
            recommender,
            accounts,
            scheduler: Arc::new(SettlementScheduler::new()),
            timing,
            timers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build the desk and its simulator from configuration.
    pub fn from_config(
        cfg: &AppConfig,
        recommender: Arc<dyn Recommender>,
        accounts: Arc<AccountService>,
    ) -> Self {
        let mut rng: Box<dyn RandomSource> = match cfg.simulation.seed {
            Some(seed) => Box::new(StdRandom::seeded(seed)),
            None => Box::new(StdRandom::from_entropy()),
        };
        let simulator = GameSimulator::new(cfg.simulation.game_count, rng.as_mut());
        let settings = DeskSettings {
            initial_balance: cfg.desk.initial_balance,
            stake: cfg.bot.stake,
            confidence_threshold: cfg.bot.confidence_threshold,
            currency: cfg.desk.currency.clone(),
        };
        let mut desk = Desk::new(settings, simulator, rng);
        desk.set_bot_active(cfg.bot.start_active);

        Self::new(desk, recommender, accounts, BotTiming::from_config(cfg))
    }

    fn timers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Spawn the game tick, scan and equity timers. No-op if already
    /// running.
    pub fn start(&self) {
        let mut timers = self.timers();
        if !timers.is_empty() {
            warn!("Desk timers already running");
            return;
        }

        timers.push(self.spawn_every(self.timing.tick_interval, |bot| async move {
            bot.tick_games().await;
        }));
        timers.push(self.spawn_every(self.timing.scan_interval, |bot| async move {
            bot.run_scan_cycle().await;
        }));
        timers.push(self.spawn_every(self.timing.equity_interval, |bot| async move {
            bot.record_equity().await;
        }));

        info!(
            tick_secs = self.timing.tick_interval.as_secs(),
            scan_secs = self.timing.scan_interval.as_secs(),
            resolve_secs = self.timing.resolve_delay.as_secs(),
            "Desk timers started"
        );
    }

    pub fn is_running(&self) -> bool {
        !self.timers().is_empty()
    }

    /// Abort every timer and every pending settlement.
    pub async fn shutdown(&self) {
        let timers: Vec<_> = self.timers().drain(..).collect();
        for handle in &timers {
            handle.abort();
        }
        let cancelled = self.scheduler.cancel_all();

        let mut desk = self.desk.write().await;
        desk.set_bot_active(false);
        desk.log(
            format!("Desk stopped. {cancelled} pending settlement(s) cancelled."),
            LogKind::Warning,
        );
    }

    /// Run `job` every `period`, first after one full period. Slow jobs
    /// skip ticks instead of queueing them.
    fn spawn_every<F, Fut>(&self, period: Duration, job: F) -> JoinHandle<()>
    where
        F: Fn(BetBot) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let bot = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                job(bot.clone()).await;
            }
        })
    }

    // -- Timer jobs ---------------------------------------------------------

    pub async fn tick_games(&self) -> usize {
        self.desk.write().await.tick_games()
    }

    pub async fn record_equity(&self) {
        self.desk.write().await.record_equity();
    }

    /// One bot cycle: pick a game, ask for a recommendation, maybe open a
    /// position. The desk lock is not held while the recommender runs.
    ///
    /// Once the in-flight slot is claimed the rest of the cycle runs in its
    /// own task, so dropping this future (a disconnected dashboard client,
    /// an aborted timer) still releases the slot when the request ends.
    pub async fn run_scan_cycle(&self) -> Option<Bet> {
        let game = self.desk.write().await.begin_scan()?;

        let bot = self.clone();
        let snapshot = game.clone();
        let cycle = tokio::spawn(async move { bot.complete_scan(snapshot).await });

        match cycle.await {
            Ok(bet) => bet,
            Err(e) => {
                warn!(game_id = %game.id, error = %e, "Scan task failed");
                let outcome = Err(anyhow::anyhow!("scan task failed: {e}"));
                self.desk.write().await.finish_scan(&game, outcome);
                None
            }
        }
    }

    async fn complete_scan(&self, game: Game) -> Option<Bet> {
        let outcome = self.recommender.recommend(&game).await;
        match &outcome {
            Ok(rec) => debug!(game_id = %game.id, recommendation = %rec, "Recommendation received"),
            Err(e) => warn!(game_id = %game.id, error = %e, "Recommendation failed"),
        }

        let mut desk = self.desk.write().await;
        let bet = desk.finish_scan(&game, outcome)?;
        self.schedule_settlement(&bet.id);
        self.persist_balance(&mut desk).await;
        Some(bet)
    }

    /// Settle a bet now. `None` if unknown or already settled.
    pub async fn resolve_bet(&self, bet_id: &str) -> Option<Bet> {
        let mut desk = self.desk.write().await;
        let bet = desk.resolve_bet(bet_id)?;
        self.persist_balance(&mut desk).await;
        Some(bet)
    }

    fn schedule_settlement(&self, bet_id: &str) {
        let bot = self.clone();
        let id = bet_id.to_string();
        self.scheduler.schedule(bet_id, self.timing.resolve_delay, async move {
            bot.resolve_bet(&id).await;
        });
    }

    pub fn pending_settlements(&self) -> usize {
        self.scheduler.pending()
    }

    /// Best effort: a failed write is logged and the desk carries on.
    async fn persist_balance(&self, desk: &mut Desk) {
        if let Err(e) = self.accounts.sync_balance(desk.balance()).await {
            desk.log(format!("Failed to persist balance: {e}"), LogKind::Error);
        }
    }

    // -- Reads --------------------------------------------------------------

    pub async fn snapshot(&self) -> DeskSnapshot {
        self.desk.read().await.snapshot()
    }

    pub async fn summary(&self) -> DeskSummary {
        self.desk.read().await.summary()
    }

    pub async fn games(&self) -> Vec<Game> {
        self.desk.read().await.games().to_vec()
    }

    pub async fn balance(&self) -> Decimal {
        self.desk.read().await.balance()
    }

    pub fn recommender_usage(&self) -> RecommenderUsage {
        self.recommender.usage()
    }

    // -- Bot controls -------------------------------------------------------

    pub async fn set_bot_active(&self, active: bool) {
        self.desk.write().await.set_bot_active(active);
    }

    pub async fn set_stake(&self, stake: Decimal) -> Result<Decimal, BetBotError> {
        self.desk.write().await.set_stake(stake)
    }

    pub async fn set_stake_percent(&self, percent: u32) -> Result<Decimal, BetBotError> {
        self.desk.write().await.set_stake_percent(percent)
    }

    // -- Session ------------------------------------------------------------

    /// Load the persisted session's balance into the desk, if any.
    pub async fn restore_session(&self) -> Result<Option<User>, BetBotError> {
        let user = self.accounts.current_user().await?;
        if let Some(user) = &user {
            self.adopt_user(user, "Session restored").await;
        }
        Ok(user)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<User, BetBotError> {
        let user = self.accounts.register(name, email, phone, password).await?;
        self.adopt_user(&user, "Account created").await;
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, BetBotError> {
        let user = self.accounts.login(email, password).await?;
        self.adopt_user(&user, "Logged in").await;
        Ok(user)
    }

    pub async fn verify(
        &self,
        email: &str,
        code: &str,
        id_number: &str,
    ) -> Result<User, BetBotError> {
        let user = self.accounts.verify(email, code, id_number).await?;
        self.adopt_user(&user, "Identity verified").await;
        Ok(user)
    }

    /// End the session and pause the bot.
    pub async fn logout(&self) -> Result<(), BetBotError> {
        self.accounts.logout().await?;
        let mut desk = self.desk.write().await;
        desk.set_bot_active(false);
        desk.log("Logged out.", LogKind::Info);
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Option<User>, BetBotError> {
        self.accounts.current_user().await
    }

    async fn adopt_user(&self, user: &User, event: &str) {
        let mut desk = self.desk.write().await;
        desk.set_balance(user.balance);
        desk.log(format!("{event}: {} ({}).", user.name, user.email), LogKind::Info);
    }

    // -- Wallet -------------------------------------------------------------

    pub async fn deposit(
        &self,
        amount: &str,
        method: PaymentMethod,
    ) -> Result<WalletReceipt, BetBotError> {
        let mut desk = self.desk.write().await;
        let receipt = self.accounts.deposit(amount, method, desk.balance()).await?;
        desk.set_balance(receipt.balance);
        let message = format!(
            "Deposit of {}{} via {method} completed.",
            desk.settings().currency,
            receipt.transaction.amount
        );
        desk.log(message, LogKind::Success);
        Ok(receipt)
    }

    /// Withdraw from the free balance. Funds at risk are not available.
    pub async fn withdraw(&self, amount: &str) -> Result<WalletReceipt, BetBotError> {
        let mut desk = self.desk.write().await;
        let receipt = self.accounts.withdraw(amount, desk.balance()).await?;
        desk.set_balance(receipt.balance);
        let message = format!(
            "Withdrawal of {}{} completed.",
            desk.settings().currency,
            receipt.transaction.amount
        );
        desk.log(message, LogKind::Success);
        Ok(receipt)
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>, BetBotError> {
        self.accounts.transactions().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockRecommender;
    use crate::sim::{calculate_odds, ScriptedRandom};
    use crate::storage::{AccountRepository, KvAccountRepository, MemoryStore};
    use crate::types::{payout, BetStatus, GameStats, GameStatus, Recommendation, Selection, Sport};
    use rust_decimal_macros::dec;

    fn fixture() -> Game {
        let stats = GameStats {
            score: [1, 0],
            possession: [55, 45],
            shots: [6, 2],
            yellow_cards: [0, 1],
            corners: [5, 1],
            fouls: [6, 9],
            player_form: [8.2, 6.1],
            time: 45,
        };
        Game {
            id: "g-1".into(),
            sport: Sport::Soccer,
            league: "Premier League".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            odds: calculate_odds(Sport::Soccer, &stats),
            stats,
            status: GameStatus::Live,
        }
    }

    fn recommending(selection: Selection, confidence: f64) -> MockRecommender {
        let mut mock = MockRecommender::new();
        mock.expect_recommend().returning(move |_| {
            Ok(Recommendation {
                confidence,
                reasoning: "Home side controlling the midfield".into(),
                recommendation: selection,
            })
        });
        mock
    }

    fn bot_with(
        recommender: MockRecommender,
        samples: Vec<f64>,
    ) -> (BetBot, Arc<KvAccountRepository>) {
        let repo = Arc::new(KvAccountRepository::new(Arc::new(MemoryStore::new())));
        let accounts = Arc::new(AccountService::new(repo.clone(), dec!(10000)));
        let desk = Desk::new(
            DeskSettings::default(),
            GameSimulator::from_games(vec![fixture()]),
            Box::new(ScriptedRandom::new(samples)),
        );
        let bot = BetBot::new(desk, Arc::new(recommender), accounts, BotTiming::default());
        (bot, repo)
    }

    #[tokio::test(start_paused = true)]
    async fn test_confident_home_pick_opens_and_settles() {
        // 0.0 picks the only game, 0.5 < 0.9 wins the settlement
        let (bot, repo) = bot_with(recommending(Selection::Home, 90.0), vec![0.0, 0.5]);
        let user = bot.register("Thandi", "t@example.com", "082", "pw").await.unwrap();
        bot.set_bot_active(true).await;

        let bet = bot.run_scan_cycle().await.unwrap();
        assert_eq!(bet.odds, fixture().odds.home);
        assert_eq!(bet.amount, dec!(500));
        assert_eq!(bot.balance().await, dec!(9500));
        assert_eq!(repo.find_by_id(&user.id).await.unwrap().unwrap().balance, dec!(9500));
        assert_eq!(bot.pending_settlements(), 1);

        tokio::time::sleep(Duration::from_secs(16)).await;

        let expected = dec!(9500) + payout(dec!(500), bet.odds);
        assert_eq!(bot.balance().await, expected);
        let snapshot = bot.snapshot().await;
        assert_eq!(snapshot.bets[0].status, BetStatus::Won);
        assert_eq!(repo.find_by_id(&user.id).await.unwrap().unwrap().balance, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_losing_settlement_keeps_debit() {
        let (bot, _) = bot_with(recommending(Selection::Home, 90.0), vec![0.0, 0.95]);
        bot.set_bot_active(true).await;

        bot.run_scan_cycle().await.unwrap();
        tokio::time::sleep(Duration::from_secs(16)).await;

        assert_eq!(bot.balance().await, dec!(9500));
        assert_eq!(bot.summary().await.loss_count, 1);
    }

    #[tokio::test]
    async fn test_confidence_eighty_places_nothing() {
        let (bot, _) = bot_with(recommending(Selection::Home, 80.0), vec![0.0]);
        bot.set_bot_active(true).await;

        assert!(bot.run_scan_cycle().await.is_none());
        assert_eq!(bot.balance().await, dec!(10000));
        assert!(bot.snapshot().await.bets.is_empty());
        assert_eq!(bot.pending_settlements(), 0);
    }

    #[tokio::test]
    async fn test_recommender_error_skips_cycle() {
        let mut mock = MockRecommender::new();
        mock.expect_recommend()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("HTTP 503")));
        let (bot, _) = bot_with(mock, vec![0.0]);
        bot.set_bot_active(true).await;

        assert!(bot.run_scan_cycle().await.is_none());
        let snapshot = bot.snapshot().await;
        assert!(!snapshot.analyzing);
        assert!(snapshot.bets.is_empty());
        assert!(snapshot.logs.iter().any(|l| l.kind == LogKind::Error));
    }

    #[tokio::test]
    async fn test_paused_bot_never_calls_recommender() {
        let mut mock = MockRecommender::new();
        mock.expect_recommend().never();
        let (bot, _) = bot_with(mock, vec![]);

        assert!(bot.run_scan_cycle().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_open_and_shutdown_cancels_settlement() {
        let (bot, _) = bot_with(recommending(Selection::Home, 95.0), vec![]);
        bot.set_bot_active(true).await;
        bot.start();
        assert!(bot.is_running());

        tokio::time::sleep(Duration::from_secs(11)).await;
        let snapshot = bot.snapshot().await;
        assert_eq!(snapshot.bets.len(), 1);
        assert_eq!(snapshot.balance, dec!(9500));
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.games[0].stats.time, 47);
        assert_eq!(bot.pending_settlements(), 1);

        bot.shutdown().await;
        assert!(!bot.is_running());
        assert_eq!(bot.pending_settlements(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = bot.snapshot().await;
        assert_eq!(snapshot.bets.len(), 1);
        assert_eq!(snapshot.bets[0].status, BetStatus::Open);
        assert_eq!(snapshot.balance, dec!(9500));
        assert!(!snapshot.bot_active);
    }

    #[tokio::test]
    async fn test_wallet_moves_desk_balance() {
        let (bot, _) = bot_with(MockRecommender::new(), vec![]);
        bot.register("A", "a@example.com", "1", "pw").await.unwrap();

        bot.deposit("2500", PaymentMethod::Eft).await.unwrap();
        assert_eq!(bot.balance().await, dec!(12500));

        let err = bot.withdraw("20000").await.unwrap_err();
        assert!(matches!(err, BetBotError::InsufficientBalance { .. }));

        bot.withdraw("500").await.unwrap();
        assert_eq!(bot.balance().await, dec!(12000));
        assert_eq!(bot.transactions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_login_loads_stored_balance_and_logout_pauses() {
        let (bot, repo) = bot_with(MockRecommender::new(), vec![]);
        let user = bot.register("A", "a@example.com", "1", "pw").await.unwrap();
        repo.modify_user(&user.id, &|u| u.balance = dec!(777)).await.unwrap();

        bot.set_bot_active(true).await;
        bot.logout().await.unwrap();
        assert!(!bot.snapshot().await.bot_active);

        bot.login("a@example.com", "pw").await.unwrap();
        assert_eq!(bot.balance().await, dec!(777));
    }
}
