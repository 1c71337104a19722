//! The balance engine turns recorded transactions into per-account running balances.
//!
//! The engine holds no state of its own beyond a handle to the ledger and the configured account
//! set. Every call reads from, or writes to, the SQLite ledger.

use crate::db::Db;
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{AccountSummary, DisplayRow, Kind, PendingDeltas, Transaction};
use crate::Result;
use std::pin::Pin;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

/// Records transactions and projects balances for a configured set of accounts.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Db,
    accounts: Vec<String>,
}

impl Engine {
    pub(crate) fn new(db: Db, accounts: Vec<String>) -> Self {
        Self { db, accounts }
    }

    /// The configured account names in display order.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Records a transaction of `amount` against `account`.
    ///
    /// `amount` is the unsigned magnitude entered by the user; it is negated when `kind` is
    /// `Liability`. The `finance` row and the `balance_summary` upsert are committed together.
    ///
    /// # Errors
    /// - `Validation` if `account` is empty or not configured, `amount` is not positive, or the
    ///   running total would overflow. Nothing is written.
    /// - `Storage` if the ledger cannot be read or the write cannot be committed. Nothing is
    ///   written.
    pub async fn record_transaction(
        &self,
        account: &str,
        amount: i64,
        kind: Kind,
    ) -> Result<Transaction> {
        let account = account.trim();
        if account.is_empty() {
            return Err(Error::validation("An account is required"));
        }
        if !self.accounts.iter().any(|a| a == account) {
            return Err(Error::validation(format!(
                "Unknown account '{account}', expected one of: {}",
                self.accounts.join(", ")
            )));
        }
        if amount <= 0 {
            return Err(Error::validation(format!(
                "The amount must be greater than zero, got {amount}"
            )));
        }

        let signed = kind.signed(amount);
        let existing = self
            .db
            .summary(account)
            .await
            .pub_result(ErrorType::Storage)?;
        if let Some(summary) = existing {
            if summary.cumulative_transactions().checked_add(signed).is_none() {
                return Err(Error::validation(format!(
                    "Recording {signed} would overflow the running total of '{account}'"
                )));
            }
        }

        let now = chrono::Utc::now().naive_utc();
        let transaction = self
            .db
            .record(account, signed, kind, now)
            .await
            .pub_result(ErrorType::Storage)?;
        info!(
            "Recorded transaction {} for '{}': {} ({})",
            transaction.id(),
            transaction.account(),
            transaction.amount(),
            transaction.kind()
        );
        Ok(transaction)
    }

    /// Computes a display row for each of `accounts`, in the given order.
    ///
    /// The baseline of an account is `previous_balance + cumulative_transactions` from its summary
    /// row, or zero when it has none. The current balance adds the account's entry in
    /// `pending_deltas`, if any. Nothing is written.
    pub async fn compute_current_balances(
        &self,
        accounts: &[String],
        pending_deltas: &PendingDeltas,
    ) -> Result<Vec<DisplayRow>> {
        let mut rows = Vec::with_capacity(accounts.len());
        for account in accounts {
            let summary = self
                .db
                .summary(account)
                .await
                .pub_result(ErrorType::Storage)?;
            let delta = pending_deltas.get(account).copied().unwrap_or_default();
            let row = DisplayRow::project(account, summary.as_ref(), delta)
                .pub_result(ErrorType::Validation)?;
            rows.push(row);
        }
        debug!("Computed {} display rows", rows.len());
        Ok(rows)
    }

    /// `compute_current_balances` for every configured account.
    pub async fn current_balances(&self, pending_deltas: &PendingDeltas) -> Result<Vec<DisplayRow>> {
        self.compute_current_balances(&self.accounts, pending_deltas)
            .await
    }

    /// Returns the summary row of `account`, if one exists.
    pub async fn summary(&self, account: &str) -> Result<Option<AccountSummary>> {
        self.db.summary(account).await.pub_result(ErrorType::Storage)
    }

    /// Returns a handle to the transaction log.
    pub fn fetch_ledger(&self) -> Ledger {
        Ledger {
            db: self.db.clone(),
        }
    }
}

/// The append-only transaction log.
///
/// Each call to `stream` starts a new read from the first transaction, so the log can be walked
/// any number of times.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Db,
}

impl Ledger {
    /// Lazily streams every transaction in ascending id order.
    pub fn stream(&self) -> Pin<Box<dyn Stream<Item = Result<Transaction>> + Send + '_>> {
        Box::pin(
            self.db
                .ledger_stream()
                .map(|res| res.pub_result(ErrorType::Storage)),
        )
    }

    /// The number of recorded transactions.
    pub async fn count(&self) -> Result<u64> {
        self.db
            .count_transactions()
            .await
            .pub_result(ErrorType::Storage)
    }

    /// Reads the whole log into memory.
    pub async fn collect(&self) -> Result<Vec<Transaction>> {
        self.stream().collect().await
    }
}
