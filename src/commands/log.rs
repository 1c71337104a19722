//! The `log` command, which prints the transaction log.

use crate::args::OutputFormat;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::Transaction;
use crate::{render, Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use tracing::debug;

// =============================================================================
// Rows type for log output
// =============================================================================

/// The transaction log in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    /// JSON array of transaction objects.
    Json(serde_json::Value),
    /// Markdown table as a single formatted string.
    Table(String),
    /// CSV data as a properly escaped string.
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => {
                if let Ok(s) = serde_json::to_string_pretty(v) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:?}", v)
                }
            }
            Rows::Table(s) => write!(f, "{}", s),
            Rows::Csv(s) => write!(f, "{}", s),
        }
    }
}

impl Rows {
    fn build(transactions: &[Transaction], format: OutputFormat) -> Res<Self> {
        Ok(match format {
            OutputFormat::Table => Rows::Table(render::ledger_table(transactions)),
            OutputFormat::Json => Rows::Json(
                serde_json::to_value(transactions).context("Unable to serialize transactions")?,
            ),
            OutputFormat::Csv => Rows::Csv(to_csv(transactions)?),
        })
    }
}

// =============================================================================
// Output formats
// =============================================================================

/// Writes the transactions as CSV with a header row.
fn to_csv(transactions: &[Transaction]) -> Res<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["id", "created_at", "account", "type", "amount"])?;
    for t in transactions {
        writer.write_record([
            t.id().to_string(),
            t.created_at_string(),
            t.account().to_string(),
            t.kind().to_string(),
            t.amount().to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Unable to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// =============================================================================
// Command implementation
// =============================================================================

/// Prints every transaction in id order.
pub async fn log(config: &Config, format: OutputFormat) -> Result<Out<Rows>> {
    let ledger = config.engine().fetch_ledger();
    debug!("Reading {} transactions", ledger.count().await?);
    let transactions = ledger.collect().await?;
    let rows = Rows::build(&transactions, format).pub_result(ErrorType::Storage)?;
    let message = if transactions.is_empty() {
        "The ledger has no transactions".to_string()
    } else {
        rows.to_string()
    };
    Ok(Out::new(message, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Kind;
    use crate::test::TestEnv;

    async fn env_with_two_transactions() -> TestEnv {
        let env = TestEnv::new().await;
        let engine = env.engine();
        engine
            .record_transaction("預金", 300_000, Kind::Asset)
            .await
            .unwrap();
        engine
            .record_transaction("社内積立", 5000, Kind::Liability)
            .await
            .unwrap();
        env
    }

    #[tokio::test]
    async fn test_log_table() {
        let env = env_with_two_transactions().await;
        let out = log(&env.config(), OutputFormat::Table).await.unwrap();
        let lines: Vec<&str> = out.message().lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("| 1 |"));
        assert!(lines[2].ends_with("| 預金 | 金融資産 | ¥300,000 |"));
        assert!(lines[3].ends_with("| 社内積立 | 負債 | -¥5,000 |"));
    }

    #[tokio::test]
    async fn test_log_json() {
        let env = env_with_two_transactions().await;
        let out = log(&env.config(), OutputFormat::Json).await.unwrap();
        let Some(Rows::Json(value)) = out.structure() else {
            panic!("expected JSON rows")
        };
        assert_eq!(value[0]["account"], "預金");
        assert_eq!(value[1]["amount"], -5000);
        assert_eq!(value[1]["kind"], "負債");
    }

    #[tokio::test]
    async fn test_log_csv() {
        let env = env_with_two_transactions().await;
        let out = log(&env.config(), OutputFormat::Csv).await.unwrap();
        let mut lines = out.message().lines();
        assert_eq!(lines.next(), Some("id,created_at,account,type,amount"));
        assert!(lines.next().unwrap().ends_with(",預金,金融資産,300000"));
        assert!(lines.next().unwrap().ends_with(",社内積立,負債,-5000"));
    }

    #[tokio::test]
    async fn test_log_empty() {
        let env = TestEnv::new().await;
        let out = log(&env.config(), OutputFormat::Table).await.unwrap();
        assert_eq!(out.message(), "The ledger has no transactions");
    }
}
