use crate::commands::Out;
use crate::config::AccountConfig;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the ledger home directory and:
/// - Creates an initial `config.json` file listing `accounts` along with default settings
/// - Creates the SQLite ledger with the `finance` and `balance_summary` tables
/// - Writes the baseline of every account that has an initial balance
///
/// # Arguments
/// - `ledger_home` - The directory that will hold the ledger, e.g. `$HOME/asset-ledger`
/// - `accounts` - The accounts in display order.
///
/// # Errors
/// - Returns an error if the accounts are invalid, a ledger already exists, or any file operation
///   fails.
pub async fn init(ledger_home: &Path, accounts: Vec<AccountConfig>) -> Result<Out<Vec<AccountConfig>>> {
    let config = Config::create(ledger_home, accounts)
        .await
        .context("Unable to create the ledger home directory and config")
        .pub_result(ErrorType::Config)?;
    Ok(Out::new(
        format!(
            "Successfully created the ledger at '{}' with accounts: {}",
            config.root().display(),
            config.account_names().join(", ")
        ),
        config.accounts().to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger");
        let out = init(&home, AccountConfig::defaults()).await.unwrap();
        assert!(out.message().contains("預金, 財形貯蓄, 社内積立"));

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.account_names(), vec!["預金", "財形貯蓄", "社内積立"]);
    }

    #[tokio::test]
    async fn test_init_twice_is_config_error() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger");
        init(&home, AccountConfig::defaults()).await.unwrap();
        let err = init(&home, AccountConfig::defaults()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }
}
