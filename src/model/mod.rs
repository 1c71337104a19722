//! Types that represent the core data model, such as `Transaction` and `AccountSummary`.
mod summary;
mod transaction;
mod yen;

pub use summary::{AccountSummary, DisplayRow, PendingDeltas};
pub(crate) use transaction::CREATED_AT_FORMAT;
pub use transaction::{Kind, Transaction};
pub use yen::{Yen, YenError};
