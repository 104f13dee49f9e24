//! Simulated wallet: deposits, withdrawals and history.
//!
//! Amounts arrive as free text from the presentation layer. Every
//! accepted operation is recorded as a completed transaction against
//! the active user and moves the stored balance immediately.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use super::AccountService;
use crate::types::{
    BetBotError, PaymentMethod, Transaction, TransactionKind, TransactionStatus,
};

/// Result of an accepted wallet operation.
#[derive(Debug, Clone, Serialize)]
pub struct WalletReceipt {
    pub transaction: Transaction,
    pub balance: Decimal,
}

/// Parse a user-entered amount. Must be numeric and strictly positive.
pub fn parse_amount(text: &str) -> Result<Decimal, BetBotError> {
    let trimmed = text.trim();
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| BetBotError::InvalidAmount(format!("'{trimmed}' is not a number")))?;
    if amount <= Decimal::ZERO {
        return Err(BetBotError::InvalidAmount(format!("{amount} must be greater than zero")));
    }
    Ok(amount)
}

impl AccountService {
    /// Credit `amount` via one of the deposit rails.
    pub async fn deposit(
        &self,
        amount: &str,
        method: PaymentMethod,
        balance: Decimal,
    ) -> Result<WalletReceipt, BetBotError> {
        if method == PaymentMethod::BankTransfer {
            return Err(BetBotError::InvalidPaymentMethod(method.to_string()));
        }
        let amount = parse_amount(amount)?;
        self.record(TransactionKind::Deposit, amount, method, balance + amount)
            .await
    }

    /// Debit `amount` by bank transfer. Cannot exceed `available`.
    pub async fn withdraw(
        &self,
        amount: &str,
        available: Decimal,
    ) -> Result<WalletReceipt, BetBotError> {
        let amount = parse_amount(amount)?;
        if amount > available {
            return Err(BetBotError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.record(
            TransactionKind::Withdrawal,
            amount,
            PaymentMethod::BankTransfer,
            available - amount,
        )
        .await
    }

    /// The active user's transactions, newest first.
    pub async fn transactions(&self) -> Result<Vec<Transaction>, BetBotError> {
        let user = self.require_user().await?;
        Ok(self.repo.transactions(&user.id).await?)
    }

    /// Move the stored balance, then log the transaction. If the log
    /// write fails the balance is put back so history and balance agree.
    async fn record(
        &self,
        kind: TransactionKind,
        amount: Decimal,
        method: PaymentMethod,
        new_balance: Decimal,
    ) -> Result<WalletReceipt, BetBotError> {
        let user = self.require_user().await?;
        let previous = user.balance;

        self.repo
            .modify_user(&user.id, &|u| u.balance = new_balance)
            .await?
            .ok_or(BetBotError::UserNotFound)?;

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            kind,
            amount,
            method,
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.repo.add_transaction(&user.id, &transaction).await {
            if let Err(revert) = self.repo.modify_user(&user.id, &|u| u.balance = previous).await {
                warn!(user_id = %user.id, error = %revert, "Failed to restore balance");
            }
            return Err(e.into());
        }

        info!(
            user_id = %user.id,
            kind = %kind,
            %amount,
            method = %method,
            balance = %new_balance,
            "Wallet transaction completed"
        );
        Ok(WalletReceipt {
            transaction,
            balance: new_balance,
        })
    }
}
