//! Dashboard API route handlers.
//!
//! All endpoints return JSON. The desk is shared through the cloneable
//! `BetBot` handle; domain errors map to 4xx responses with an
//! `{"error": message}` body.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::account::wallet::WalletReceipt;
use crate::engine::{BetBot, DeskSnapshot, DeskSummary};
use crate::llm::RecommenderUsage;
use crate::types::{BalancePoint, Bet, BetBotError, BotLog, Game, PaymentMethod, Transaction, User};

pub type AppState = BetBot;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A `BetBotError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BetBotError);

impl From<BetBotError> for ApiError {
    fn from(err: BetBotError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BetBotError::DuplicateUser | BetBotError::AlreadySettled(_) => StatusCode::CONFLICT,
            BetBotError::InvalidCredentials | BetBotError::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            BetBotError::UserNotFound => StatusCode::NOT_FOUND,
            BetBotError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BetBotError::InvalidVerificationCode
            | BetBotError::InvalidIdNumber
            | BetBotError::InvalidAmount(_)
            | BetBotError::InvalidStake(_)
            | BetBotError::InvalidPaymentMethod(_)
            | BetBotError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Dashboard request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Dashboard request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    #[serde(default)]
    pub stake: Option<Decimal>,
    /// Percentage of the current balance, e.g. 2, 5, 10 or 25.
    #[serde(default)]
    pub percent: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
    pub id_number: String,
}

/// Amounts are accepted as JSON strings or numbers and validated as text.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Value,
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub bot_active: bool,
    pub stake: Decimal,
    pub analyzing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

fn amount_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn bot_status(snapshot: &DeskSnapshot) -> BotStatus {
    BotStatus {
        bot_active: snapshot.bot_active,
        stake: snapshot.stake,
        analyzing: snapshot.analyzing,
    }
}

// ---------------------------------------------------------------------------
// Read handlers
// ---------------------------------------------------------------------------

/// GET /api/desk
pub async fn get_desk(State(bot): State<AppState>) -> Json<DeskSnapshot> {
    Json(bot.snapshot().await)
}

/// GET /api/summary
pub async fn get_summary(State(bot): State<AppState>) -> Json<DeskSummary> {
    Json(bot.summary().await)
}

/// GET /api/games
pub async fn get_games(State(bot): State<AppState>) -> Json<Vec<Game>> {
    Json(bot.games().await)
}

/// GET /api/bets
pub async fn get_bets(State(bot): State<AppState>) -> Json<Vec<Bet>> {
    Json(bot.snapshot().await.bets)
}

/// GET /api/logs
pub async fn get_logs(State(bot): State<AppState>) -> Json<Vec<BotLog>> {
    Json(bot.snapshot().await.logs)
}

/// GET /api/balance-history
pub async fn get_balance_history(State(bot): State<AppState>) -> Json<Vec<BalancePoint>> {
    Json(bot.snapshot().await.history)
}

/// GET /api/recommender
pub async fn get_recommender(State(bot): State<AppState>) -> Json<RecommenderUsage> {
    Json(bot.recommender_usage())
}

/// GET /api/session
pub async fn get_session(State(bot): State<AppState>) -> ApiResult<SessionResponse> {
    Ok(Json(SessionResponse {
        user: bot.current_user().await?,
    }))
}

/// GET /api/wallet/transactions
pub async fn get_transactions(State(bot): State<AppState>) -> ApiResult<Vec<Transaction>> {
    Ok(Json(bot.transactions().await?))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Bot actions
// ---------------------------------------------------------------------------

/// POST /api/bot/start
pub async fn start_bot(State(bot): State<AppState>) -> Json<BotStatus> {
    bot.set_bot_active(true).await;
    Json(bot_status(&bot.snapshot().await))
}

/// POST /api/bot/stop
pub async fn stop_bot(State(bot): State<AppState>) -> Json<BotStatus> {
    bot.set_bot_active(false).await;
    Json(bot_status(&bot.snapshot().await))
}

/// POST /api/bot/stake
pub async fn set_stake(
    State(bot): State<AppState>,
    Json(req): Json<StakeRequest>,
) -> ApiResult<BotStatus> {
    match (req.stake, req.percent) {
        (Some(stake), None) => bot.set_stake(stake).await?,
        (None, Some(percent)) => bot.set_stake_percent(percent).await?,
        _ => {
            return Err(BetBotError::InvalidStake(
                "provide exactly one of `stake` or `percent`".into(),
            )
            .into())
        }
    };
    Ok(Json(bot_status(&bot.snapshot().await)))
}

/// POST /api/bot/scan: run one scan cycle now.
pub async fn scan_now(State(bot): State<AppState>) -> Json<Option<Bet>> {
    Json(bot.run_scan_cycle().await)
}

// ---------------------------------------------------------------------------
// Session actions
// ---------------------------------------------------------------------------

/// POST /api/auth/register
pub async fn register(
    State(bot): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = bot
        .register(&req.name, &req.email, &req.phone, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn login(State(bot): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<User> {
    Ok(Json(bot.login(&req.email, &req.password).await?))
}

/// POST /api/auth/verify
pub async fn verify(State(bot): State<AppState>, Json(req): Json<VerifyRequest>) -> ApiResult<User> {
    Ok(Json(bot.verify(&req.email, &req.code, &req.id_number).await?))
}

/// POST /api/auth/logout
pub async fn logout(State(bot): State<AppState>) -> Result<StatusCode, ApiError> {
    bot.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Wallet actions
// ---------------------------------------------------------------------------

/// POST /api/wallet/deposit
pub async fn deposit(
    State(bot): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<WalletReceipt> {
    let method: PaymentMethod = req.method.parse()?;
    Ok(Json(bot.deposit(&amount_text(&req.amount), method).await?))
}

/// POST /api/wallet/withdraw
pub async fn withdraw(
    State(bot): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> ApiResult<WalletReceipt> {
    Ok(Json(bot.withdraw(&amount_text(&req.amount)).await?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
