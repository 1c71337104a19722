//! Configuration file handling for the ledger.
//!
//! The configuration file is stored at `$ASSET_LEDGER_HOME/config.json` and contains the set of
//! accounts (in display order) with their optional initial balances, the motivational comment
//! provider settings, and the chart scaling.

use crate::db::Db;
use crate::engine::Engine;
use crate::error::{ErrorType, IntoResult, Res};
use crate::Result;
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "asset-ledger";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const LEDGER_SQLITE: &str = "ledger.sqlite";

/// The accounts configured by `init` when none are given.
pub const DEFAULT_ACCOUNTS: &[&str] = &["預金", "財形貯蓄", "社内積立"];

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 50;
const DEFAULT_CHART_FLOOR: i64 = 1_500_000;
const DEFAULT_CHART_HEADROOM: i64 = 100_000;
const DEFAULT_CHART_WIDTH: usize = 40;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$ASSET_LEDGER_HOME` and from there it loads `config.json` and opens the SQLite
/// ledger.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
}

impl Config {
    /// Creates the ledger home directory and:
    /// - Creates an initial `config.json` with `accounts` and default settings
    /// - Creates the SQLite ledger
    /// - Writes the baseline summary row of every account that declares an initial balance
    ///
    /// # Errors
    /// - Returns an error if `accounts` is empty or contains empty or duplicate names.
    /// - Returns an error if a ledger already exists in `dir`.
    /// - Returns an error if any file operations fail.
    pub(crate) async fn create(dir: impl Into<PathBuf>, accounts: Vec<AccountConfig>) -> Res<Self> {
        let accounts = trim_names(accounts);
        validate_accounts(&accounts)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the ledger home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!("A config file already exists at '{}'", config_path.display())
        }

        let db = Db::init(root.join(LEDGER_SQLITE))
            .await
            .context("Unable to create SQLite DB")?;

        let config_file = ConfigFile {
            accounts,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let config = Self {
            root,
            config_path,
            config_file,
            db,
        };
        config.seed_baselines().await?;
        Ok(config)
    }

    /// This will
    /// - validate that the ledger home exists and that the config file exists
    /// - load and validate the config file
    /// - open (and if needed, migrate) the SQLite ledger
    /// - write baselines for configured accounts that do not have a summary row yet
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::open(home.into()).await.pub_result(ErrorType::Config)
    }

    async fn open(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The ledger home is missing, run 'ledger init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let db = Db::load(root.join(LEDGER_SQLITE))
            .await
            .context("Unable to load SQLite DB")?;

        let config = Self {
            root,
            config_path,
            config_file,
            db,
        };
        config.seed_baselines().await?;
        Ok(config)
    }

    async fn seed_baselines(&self) -> Res<()> {
        for account in self.accounts() {
            if let Some(initial_balance) = account.initial_balance() {
                if self.db.seed_baseline(account.name(), initial_balance).await? {
                    debug!(
                        "Seeded the baseline of '{}' with {initial_balance}",
                        account.name()
                    );
                }
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sqlite_path(&self) -> &Path {
        self.db.path()
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    /// The configured accounts in display order.
    pub fn accounts(&self) -> &[AccountConfig] {
        &self.config_file.accounts
    }

    /// The configured account names in display order.
    pub fn account_names(&self) -> Vec<String> {
        self.accounts()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn comment(&self) -> &CommentConfig {
        &self.config_file.comment
    }

    pub fn chart(&self) -> &ChartConfig {
        &self.config_file.chart
    }

    /// Creates the balance engine for this ledger.
    pub fn engine(&self) -> Engine {
        Engine::new(self.db.clone(), self.account_names())
    }
}

/// An account and its optional initial balance.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AccountConfig {
    pub(crate) name: String,

    /// When present, the account's summary row is created with this `previous_balance`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) initial_balance: Option<i64>,
}

impl AccountConfig {
    pub fn new(name: impl Into<String>, initial_balance: Option<i64>) -> Self {
        Self {
            name: name.into(),
            initial_balance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_balance(&self) -> Option<i64> {
        self.initial_balance
    }

    /// The default account set with no initial balances.
    pub fn defaults() -> Vec<Self> {
        DEFAULT_ACCOUNTS
            .iter()
            .map(|name| Self::new(*name, None))
            .collect()
    }
}

/// Settings for the motivational comment provider.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CommentConfig {
    /// Whether `balances` asks for a comment.
    pub(crate) enabled: bool,
    /// The base URL of an OpenAI-compatible API.
    pub(crate) endpoint: String,
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CommentConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Scaling of the balances bar chart. The top of the scale is
/// `max(largest current balance + headroom, floor)`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub(crate) floor: i64,
    pub(crate) headroom: i64,
    /// The number of characters of the longest possible bar.
    pub(crate) width: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            floor: DEFAULT_CHART_FLOOR,
            headroom: DEFAULT_CHART_HEADROOM,
            width: DEFAULT_CHART_WIDTH,
        }
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "asset-ledger",
///   "config_version": 1,
///   "accounts": [
///     { "name": "預金", "initial_balance": 1000000 },
///     { "name": "財形貯蓄", "initial_balance": 200000 },
///     { "name": "社内積立" }
///   ],
///   "comment": { "enabled": true, "endpoint": "https://api.openai.com/v1", "model": "gpt-4o-mini", "max_tokens": 50 },
///   "chart": { "floor": 1500000, "headroom": 100000, "width": 40 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "asset-ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The accounts, in display order
    accounts: Vec<AccountConfig>,

    #[serde(default)]
    comment: CommentConfig,

    #[serde(default)]
    chart: ChartConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            accounts: AccountConfig::defaults(),
            comment: CommentConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if its contents are invalid
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let mut config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version == CONFIG_VERSION,
            "Unsupported config_version {} in config file, expected {}",
            config.config_version,
            CONFIG_VERSION
        );
        config.accounts = trim_names(config.accounts);
        validate_accounts(&config.accounts)
            .with_context(|| format!("Invalid accounts in config file {}", path.display()))?;

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// Account names are matched against trimmed input, so they are stored trimmed as well.
fn trim_names(accounts: Vec<AccountConfig>) -> Vec<AccountConfig> {
    accounts
        .into_iter()
        .map(|a| AccountConfig::new(a.name.trim(), a.initial_balance))
        .collect()
}

fn validate_accounts(accounts: &[AccountConfig]) -> Res<()> {
    if accounts.is_empty() {
        bail!("At least one account must be configured")
    }
    let mut seen = BTreeSet::new();
    for account in accounts {
        if account.name.trim().is_empty() {
            bail!("Account names cannot be empty")
        }
        if !seen.insert(account.name.as_str()) {
            bail!("The account '{}' is configured more than once", account.name)
        }
    }
    Ok(())
}
