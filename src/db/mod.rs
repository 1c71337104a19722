//! This module is responsible for reading, writing and managing the SQLite database

mod migrations;
mod pages;

use crate::error::Res;
use crate::model::{AccountSummary, Kind, Transaction, CREATED_AT_FORMAT};
use anyhow::{bail, Context};
use chrono::{NaiveDateTime, Timelike};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;
use tokio_stream::Stream;
use tracing::{debug, trace};

const INSERT_FINANCE: &str =
    "INSERT INTO finance (created_at, item, amount, type) VALUES (?, ?, ?, ?) RETURNING id";

/// Creates the summary row with a zero baseline or adds to its running total. `previous_balance`
/// is only written when the row is created.
const UPSERT_SUMMARY: &str = "INSERT INTO balance_summary (item, previous_balance, transactions) \
     VALUES (?, 0, ?) \
     ON CONFLICT(item) DO UPDATE SET \
     transactions = COALESCE(balance_summary.transactions, 0) + excluded.transactions";

const SEED_SUMMARY: &str = "INSERT INTO balance_summary (item, previous_balance, transactions) \
     VALUES (?, ?, 0) ON CONFLICT(item) DO NOTHING";

const SELECT_SUMMARY: &str = "SELECT item, COALESCE(previous_balance, 0), COALESCE(transactions, 0) \
     FROM balance_summary WHERE item = ?";

const SELECT_LEDGER_PAGE: &str = "SELECT id, created_at, item, amount, type FROM finance \
     WHERE id > ? ORDER BY id ASC LIMIT ?";

/// The number of `finance` rows read per connection checkout while streaming the ledger.
const LEDGER_PAGE_SIZE: u32 = 256;

/// Rows read lazily as the stream is polled.
pub(crate) type RowStream<'a, T> = Pin<Box<dyn Stream<Item = Res<T>> + Send + 'a>>;

/// A handle to the SQLite ledger. Cloning is cheap and shares the underlying pool.
///
/// The pool holds at most one connection. Each operation acquires it and returns it when the
/// operation's future completes, whether or not the operation succeeded.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
    path: PathBuf,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite client
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    ///
    /// Files written by older versions of this tool, which have no `schema_version` table, are
    /// adopted as version 0 and migrated.
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The SQLite file is missing '{}'", path.display())
        }
        Self::open(path, false).await
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn init(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A file already exists at '{}'", path.display())
        }
        Self::open(path, true).await
    }

    async fn open(path: &Path, create: bool) -> Res<Self> {
        debug!("Opening SQLite database at {}", path.display());
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open SQLite database at {}", path.display()))?;

        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;

        let (found,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .context("Failed to query schema version")?;
        let current = found.unwrap_or(0);

        if current > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {current} is newer than this program supports ({}). \
                 Is a newer version of asset-ledger available?",
                migrations::CURRENT_VERSION
            )
        }
        migrations::run(&pool, current, migrations::CURRENT_VERSION).await?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a row to `finance` and upserts the account's `balance_summary` row in a single
    /// SQLite transaction. If either statement fails, the transaction is dropped without being
    /// committed and neither write is visible.
    ///
    /// `amount` must already be signed. `created_at` is truncated to whole seconds.
    pub(crate) async fn record(
        &self,
        account: &str,
        amount: i64,
        kind: Kind,
        created_at: NaiveDateTime,
    ) -> Res<Transaction> {
        let created_at = created_at.with_nanosecond(0).unwrap_or(created_at);
        let created_at_str = created_at.format(CREATED_AT_FORMAT).to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let (id,): (i64,) = sqlx::query_as(INSERT_FINANCE)
            .bind(&created_at_str)
            .bind(account)
            .bind(amount)
            .bind(kind.to_string())
            .fetch_one(&mut *tx)
            .await
            .context("Failed to insert into finance")?;
        trace!("Inserted finance row {id}");

        sqlx::query(UPSERT_SUMMARY)
            .bind(account)
            .bind(amount)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to update balance_summary for '{account}'"))?;

        tx.commit().await.context("Failed to commit transaction")?;

        Ok(Transaction {
            id,
            created_at,
            account: account.to_string(),
            amount,
            kind,
        })
    }

    /// Returns the `balance_summary` row for `account`, if one exists. NULL columns read as zero.
    pub(crate) async fn summary(&self, account: &str) -> Res<Option<AccountSummary>> {
        let row: Option<(String, i64, i64)> = sqlx::query_as(SELECT_SUMMARY)
            .bind(account)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read balance_summary for '{account}'"))?;
        Ok(row.map(
            |(account, previous_balance, cumulative_transactions)| AccountSummary {
                account,
                previous_balance,
                cumulative_transactions,
            },
        ))
    }

    /// Creates the summary row `{previous_balance: initial_balance, transactions: 0}` unless a row
    /// for `account` already exists. Returns `true` if a row was created.
    pub(crate) async fn seed_baseline(&self, account: &str, initial_balance: i64) -> Res<bool> {
        let result = sqlx::query(SEED_SUMMARY)
            .bind(account)
            .bind(initial_balance)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to seed the baseline for '{account}'"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Streams the `finance` table in insertion order. Rows are read a page at a time as the
    /// stream is polled, and the connection goes back to the pool after each page, so other
    /// operations can run while the stream is being consumed.
    pub(crate) fn ledger_stream(&self) -> RowStream<'static, Transaction> {
        Box::pin(pages::LedgerPages::new(self.clone(), LEDGER_PAGE_SIZE))
    }

    /// Reads up to `limit` `finance` rows with an id greater than `after`.
    async fn ledger_page(&self, after: i64, limit: u32) -> Res<Vec<FinanceRow>> {
        sqlx::query_as(SELECT_LEDGER_PAGE)
            .bind(after)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read finance rows after id {after}"))
    }

    /// Returns the number of rows in the `finance` table.
    pub(crate) async fn count_transactions(&self) -> Res<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM finance")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count finance rows")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Res<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute '{sql}'"))?;
        Ok(())
    }
}

/// A raw row of the `finance` table. Every column is nullable in the schema.
#[derive(Debug, sqlx::FromRow)]
struct FinanceRow {
    id: i64,
    created_at: Option<String>,
    item: Option<String>,
    amount: Option<i64>,
    #[sqlx(rename = "type")]
    kind: Option<String>,
}

impl TryFrom<FinanceRow> for Transaction {
    type Error = anyhow::Error;

    fn try_from(row: FinanceRow) -> Res<Self> {
        let id = row.id;
        let created_at = row
            .created_at
            .with_context(|| format!("finance row {id} has no created_at"))?;
        let created_at = NaiveDateTime::parse_from_str(&created_at, CREATED_AT_FORMAT)
            .with_context(|| format!("finance row {id} has an invalid created_at '{created_at}'"))?;
        let kind = row
            .kind
            .with_context(|| format!("finance row {id} has no type"))?;
        let kind = Kind::from_str(&kind)
            .with_context(|| format!("finance row {id} has an unknown type '{kind}'"))?;
        Ok(Transaction {
            id,
            created_at,
            account: row
                .item
                .with_context(|| format!("finance row {id} has no item"))?,
            amount: row
                .amount
                .with_context(|| format!("finance row {id} has no amount"))?,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_stream::StreamExt;

    fn now() -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    async fn test_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("ledger.sqlite")).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let (dir, _db) = test_db().await;
        assert!(Db::init(dir.path().join("ledger.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Db::load(dir.path().join("missing.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_reopens_initialized_db() {
        let (dir, db) = test_db().await;
        db.record("預金", 1000, Kind::Asset, now()).await.unwrap();
        drop(db);

        let db = Db::load(dir.path().join("ledger.sqlite")).await.unwrap();
        assert_eq!(db.count_transactions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_creates_then_accumulates_summary() {
        let (_dir, db) = test_db().await;

        db.record("預金", 1000, Kind::Asset, now()).await.unwrap();
        let s = db.summary("預金").await.unwrap().unwrap();
        assert_eq!(s.previous_balance, 0);
        assert_eq!(s.cumulative_transactions, 1000);

        db.record("預金", -300, Kind::Liability, now()).await.unwrap();
        let s = db.summary("預金").await.unwrap().unwrap();
        assert_eq!(s.previous_balance, 0);
        assert_eq!(s.cumulative_transactions, 700);
    }

    #[tokio::test]
    async fn test_record_leaves_previous_balance_untouched() {
        let (_dir, db) = test_db().await;
        assert!(db.seed_baseline("財形貯蓄", 200_000).await.unwrap());

        db.record("財形貯蓄", 5000, Kind::Asset, now()).await.unwrap();

        let s = db.summary("財形貯蓄").await.unwrap().unwrap();
        assert_eq!(s.previous_balance, 200_000);
        assert_eq!(s.cumulative_transactions, 5000);
    }

    #[tokio::test]
    async fn test_seed_baseline_does_not_overwrite() {
        let (_dir, db) = test_db().await;
        assert!(db.seed_baseline("社内積立", 100_000).await.unwrap());
        assert!(!db.seed_baseline("社内積立", 999).await.unwrap());
        let s = db.summary("社内積立").await.unwrap().unwrap();
        assert_eq!(s.previous_balance, 100_000);
    }

    #[tokio::test]
    async fn test_summary_missing_is_none() {
        let (_dir, db) = test_db().await;
        assert!(db.summary("預金").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_summary_reads_null_columns_as_zero() {
        let (_dir, db) = test_db().await;
        db.execute_raw("INSERT INTO balance_summary (item) VALUES ('預金')")
            .await
            .unwrap();
        let s = db.summary("預金").await.unwrap().unwrap();
        assert_eq!(s.previous_balance, 0);
        assert_eq!(s.cumulative_transactions, 0);
    }

    #[tokio::test]
    async fn test_record_is_all_or_nothing() {
        let (_dir, db) = test_db().await;
        db.execute_raw("DROP TABLE balance_summary").await.unwrap();

        let result = db.record("預金", 1000, Kind::Asset, now()).await;

        assert!(result.is_err());
        assert_eq!(db.count_transactions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ledger_stream_is_ordered_and_restartable() {
        let (_dir, db) = test_db().await;
        db.record("預金", 1000, Kind::Asset, now()).await.unwrap();
        db.record("財形貯蓄", -2000, Kind::Liability, now())
            .await
            .unwrap();
        db.record("預金", 3000, Kind::Asset, now()).await.unwrap();

        let first: Vec<Transaction> = db.ledger_stream().collect::<Res<_>>().await.unwrap();
        let ids: Vec<i64> = first.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(first[1].account, "財形貯蓄");
        assert_eq!(first[1].amount, -2000);
        assert_eq!(first[1].kind, Kind::Liability);

        let second: Vec<Transaction> = db.ledger_stream().collect::<Res<_>>().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_ledger_stream_reads_legacy_rows() {
        let (_dir, db) = test_db().await;
        db.execute_raw(
            "INSERT INTO finance (created_at, item, amount, type) \
             VALUES ('2025-03-25 01:02:03', '預金', 5000, '資産')",
        )
        .await
        .unwrap();

        let rows: Vec<Transaction> = db.ledger_stream().collect::<Res<_>>().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, Kind::Asset);
        assert_eq!(rows[0].created_at_string(), "2025-03-25 01:02:03");
    }

    #[tokio::test]
    async fn test_ledger_stream_reports_bad_rows() {
        let (_dir, db) = test_db().await;
        db.execute_raw("INSERT INTO finance (created_at, item, amount, type) VALUES ('yesterday', '預金', 1, '負債')")
            .await
            .unwrap();
        let result: Res<Vec<Transaction>> = db.ledger_stream().collect().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_record_returns_persisted_row() {
        let (_dir, db) = test_db().await;
        let recorded = db
            .record("社内積立", -30_000, Kind::Liability, now())
            .await
            .unwrap();
        assert_eq!(recorded.created_at().nanosecond(), 0);
        let rows: Vec<Transaction> = db.ledger_stream().collect::<Res<_>>().await.unwrap();
        assert_eq!(rows, vec![recorded]);
    }

    #[tokio::test]
    async fn test_ledger_stream_spans_several_pages() {
        let (_dir, db) = test_db().await;
        let count = i64::from(LEDGER_PAGE_SIZE) * 2 + 1;
        for amount in 1..=count {
            db.record("預金", amount, Kind::Asset, now()).await.unwrap();
        }
        let rows: Vec<Transaction> = db.ledger_stream().collect::<Res<_>>().await.unwrap();
        assert_eq!(rows.len() as i64, count);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(rows.last().unwrap().amount, count);
    }
}
