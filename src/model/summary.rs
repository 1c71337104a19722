use crate::model::Yen;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row of the `balance_summary` table: the cached running total for one account.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountSummary {
    pub(crate) account: String,
    /// The baseline carried forward from when the row was created. Later writes do not change it.
    pub(crate) previous_balance: i64,
    /// The sum of every signed amount recorded for the account.
    pub(crate) cumulative_transactions: i64,
}

impl AccountSummary {
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn previous_balance(&self) -> i64 {
        self.previous_balance
    }

    pub fn cumulative_transactions(&self) -> i64 {
        self.cumulative_transactions
    }

    /// `previous_balance + cumulative_transactions`.
    pub fn baseline(&self) -> crate::error::Res<i64> {
        self.previous_balance
            .checked_add(self.cumulative_transactions)
            .with_context(|| format!("The baseline of '{}' overflows", self.account))
    }
}

/// Unsaved, session-local adjustments keyed by account name.
pub type PendingDeltas = BTreeMap<String, i64>;

/// One line of the balances display. It is never persisted.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DisplayRow {
    pub(crate) account: String,
    /// The balance before any pending delta, i.e. the baseline of the account.
    pub(crate) previous_balance: i64,
    pub(crate) pending_delta: i64,
    pub(crate) current_balance: i64,
}

impl DisplayRow {
    /// Projects a summary (missing rows count as zero) and a pending delta onto a display row.
    pub(crate) fn project(
        account: &str,
        summary: Option<&AccountSummary>,
        pending_delta: i64,
    ) -> crate::error::Res<Self> {
        let previous_balance = match summary {
            Some(summary) => summary.baseline()?,
            None => 0,
        };
        let current_balance = previous_balance
            .checked_add(pending_delta)
            .with_context(|| format!("The current balance of '{account}' overflows"))?;
        Ok(Self {
            account: account.to_string(),
            previous_balance,
            pending_delta,
            current_balance,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn previous_balance(&self) -> Yen {
        Yen::new(self.previous_balance)
    }

    pub fn pending_delta(&self) -> Yen {
        Yen::new(self.pending_delta)
    }

    pub fn current_balance(&self) -> Yen {
        Yen::new(self.current_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(previous_balance: i64, cumulative_transactions: i64) -> AccountSummary {
        AccountSummary {
            account: "財形貯蓄".to_string(),
            previous_balance,
            cumulative_transactions,
        }
    }

    #[test]
    fn test_project_missing_summary_is_zero() {
        let row = DisplayRow::project("預金", None, 0).unwrap();
        assert_eq!(row.previous_balance, 0);
        assert_eq!(row.current_balance, 0);
    }

    #[test]
    fn test_project_applies_delta_to_baseline() {
        let s = summary(200_000, 10_000);
        let row = DisplayRow::project("財形貯蓄", Some(&s), -50_000).unwrap();
        assert_eq!(row.previous_balance, 210_000);
        assert_eq!(row.pending_delta, -50_000);
        assert_eq!(row.current_balance, 160_000);
    }

    #[test]
    fn test_project_overflow_is_an_error() {
        let s = summary(i64::MAX, 1);
        assert!(DisplayRow::project("財形貯蓄", Some(&s), 0).is_err());
        let s = summary(i64::MAX, 0);
        assert!(DisplayRow::project("財形貯蓄", Some(&s), 1).is_err());
    }
}
