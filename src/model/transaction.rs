use crate::model::Yen;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The format of the `created_at` column, matching SQLite's `datetime('now')`.
pub(crate) const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a recorded amount increases or decreases the account. The sign of the stored amount is
/// derived from this.
///
/// The serialized names are the labels stored in the `type` column. Older ledgers used `資産` for
/// assets, and the English names are accepted for convenience on the command line.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum Kind {
    #[default]
    #[serde(rename = "金融資産", alias = "資産", alias = "asset", alias = "Asset")]
    Asset,
    #[serde(rename = "負債", alias = "liability", alias = "Liability")]
    Liability,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

impl Kind {
    /// Applies the sign policy: liabilities are stored as negative amounts, assets as positive.
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            Kind::Asset => amount,
            Kind::Liability => -amount,
        }
    }
}

/// A row of the append-only `finance` table.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub(crate) id: i64,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) account: String,
    /// The signed amount.
    pub(crate) amount: i64,
    pub(crate) kind: Kind,
}

impl Transaction {
    pub fn id(&self) -> i64 {
        self.id
    }

    /// When the transaction was recorded, in UTC.
    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// The amount with the sign already applied according to `kind`.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The amount as `Yen` for display.
    pub fn yen(&self) -> Yen {
        Yen::new(self.amount)
    }

    pub(crate) fn created_at_string(&self) -> String {
        self.created_at.format(CREATED_AT_FORMAT).to_string()
    }
}
