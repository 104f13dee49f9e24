//! Account service: registration, session and identity verification.
//!
//! Thin validation layer over an `AccountRepository`. The desk keeps the
//! live balance; this service loads it on login and receives it back via
//! `sync_balance` after every change. Wallet operations live in
//! [`wallet`].

pub mod wallet;

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::AccountRepository;
use crate::types::{BetBotError, User};

/// Fixed code accepted by the simulated SMS verification.
const MASTER_CODE: &str = "123456";
/// Any code with this prefix is also accepted.
const CODE_PREFIX: char = '7';
/// South African ID numbers are exactly 13 digits.
const ID_NUMBER_LEN: usize = 13;

pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    initial_balance: Decimal,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepository>, initial_balance: Decimal) -> Self {
        Self {
            repo,
            initial_balance,
        }
    }

    /// Create an unverified user and make it the active session.
    ///
    /// The password is checked for presence only and never stored.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<User, BetBotError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(BetBotError::InvalidCredentials);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.to_string(),
            phone: phone.trim().to_string(),
            id_number: None,
            balance: self.initial_balance,
            is_verified: false,
        };
        if !self.repo.insert_user(&user).await? {
            warn!(email, "Registration rejected: email already in use");
            return Err(BetBotError::DuplicateUser);
        }
        self.repo.set_session(&user.id).await?;

        info!(user_id = %user.id, email, "User registered");
        Ok(user)
    }

    /// Start a session for a registered email.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, BetBotError> {
        if password.is_empty() {
            return Err(BetBotError::InvalidCredentials);
        }
        let user = self
            .repo
            .find_by_email(email.trim())
            .await?
            .ok_or(BetBotError::InvalidCredentials)?;
        self.repo.set_session(&user.id).await?;

        info!(user_id = %user.id, verified = user.is_verified, "User logged in");
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), BetBotError> {
        self.repo.clear_session().await?;
        info!("Session cleared");
        Ok(())
    }

    /// Complete identity verification and make the user the active
    /// session.
    pub async fn verify(
        &self,
        email: &str,
        code: &str,
        id_number: &str,
    ) -> Result<User, BetBotError> {
        let code = code.trim();
        if code != MASTER_CODE && !code.starts_with(CODE_PREFIX) {
            return Err(BetBotError::InvalidVerificationCode);
        }
        if !is_valid_id_number(id_number) {
            return Err(BetBotError::InvalidIdNumber);
        }

        let found = self
            .repo
            .find_by_email(email.trim())
            .await?
            .ok_or(BetBotError::UserNotFound)?;
        let user = self
            .repo
            .modify_user(&found.id, &|u| {
                u.is_verified = true;
                u.id_number = Some(id_number.to_string());
            })
            .await?
            .ok_or(BetBotError::UserNotFound)?;
        self.repo.set_session(&user.id).await?;

        info!(user_id = %user.id, "Identity verified");
        Ok(user)
    }

    /// Profile of the active session, if any.
    pub async fn current_user(&self) -> Result<Option<User>, BetBotError> {
        Ok(self.repo.session_user().await?)
    }

    /// The active user, or `NotAuthenticated`.
    pub async fn require_user(&self) -> Result<User, BetBotError> {
        self.current_user().await?.ok_or(BetBotError::NotAuthenticated)
    }

    /// Write the desk balance back to the active user's profile.
    /// No-op without a session.
    pub async fn sync_balance(&self, balance: Decimal) -> Result<(), BetBotError> {
        let Some(user) = self.current_user().await? else {
            return Ok(());
        };
        if user.balance == balance {
            return Ok(());
        }
        self.repo.modify_user(&user.id, &|u| u.balance = balance).await?;
        debug!(user_id = %user.id, %balance, "Balance synced");
        Ok(())
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }
}

/// Exactly 13 ASCII digits.
pub fn is_valid_id_number(id_number: &str) -> bool {
    id_number.len() == ID_NUMBER_LEN && id_number.bytes().all(|b| b.is_ascii_digit())
}
