//! These structs provide the CLI interface for the ledger CLI.

use crate::config::AccountConfig;
use crate::model::{Kind, Yen};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// ledger: A command-line tool for tracking a handful of asset accounts.
///
/// Record increases and decreases to your accounts, see their running balances (optionally with
/// unsaved adjustments applied), a bar chart of the balances and the full transaction log. Data is
/// kept in a local SQLite file in the ledger home directory.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the ledger home directory, the configuration file and the SQLite ledger.
    ///
    /// Accounts are given as --account NAME or --account NAME=INITIAL_BALANCE, in the order they
    /// should be displayed. When no accounts are given, 預金, 財形貯蓄 and 社内積立 are configured
    /// without initial balances. Initial balances can also be added later by editing config.json.
    Init(InitArgs),
    /// Record an increase (asset) or decrease (liability) to an account.
    Record(RecordArgs),
    /// Show the current balance of every account.
    Balances(BalancesArgs),
    /// Show the transaction log.
    Log(LogArgs),
    /// Print a motivational comment.
    Comment,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the ledger and its configuration are held. Defaults to ~/asset-ledger
    #[arg(long, env = "ASSET_LEDGER_HOME", default_value_t = default_ledger_home())]
    ledger_home: DisplayPath,

    /// The API key for the motivational comment service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn ledger_home(&self) -> &DisplayPath {
        &self.ledger_home
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// Args for the `ledger init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// An account as NAME or NAME=INITIAL_BALANCE. May be repeated.
    #[arg(long = "account")]
    accounts: Vec<AccountArg>,
}

impl InitArgs {
    pub fn new(accounts: Vec<AccountArg>) -> Self {
        Self { accounts }
    }

    /// The accounts to configure, falling back to the defaults when none were given.
    pub fn accounts(&self) -> Vec<AccountConfig> {
        if self.accounts.is_empty() {
            return AccountConfig::defaults();
        }
        self.accounts
            .iter()
            .map(|a| AccountConfig::new(&a.name, a.initial_balance))
            .collect()
    }
}

/// `NAME` or `NAME=INITIAL_BALANCE`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AccountArg {
    name: String,
    initial_balance: Option<i64>,
}

impl FromStr for AccountArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            None => Ok(Self {
                name: s.trim().to_string(),
                initial_balance: None,
            }),
            Some((name, balance)) => {
                let balance = Yen::from_str(balance).map_err(|e| e.to_string())?;
                Ok(Self {
                    name: name.trim().to_string(),
                    initial_balance: Some(balance.value()),
                })
            }
        }
    }
}

/// Args for the `ledger record` command.
#[derive(Debug, Parser, Clone)]
pub struct RecordArgs {
    /// The account, e.g. 預金
    account: String,

    /// The amount as a positive whole number of yen, e.g. 5000 or ¥5,000
    amount: Yen,

    /// Whether the amount increases (asset) or decreases (liability) the account
    #[arg(long, default_value_t = Kind::Asset)]
    kind: Kind,
}

impl RecordArgs {
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn amount(&self) -> Yen {
        self.amount
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

/// Args for the `ledger balances` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct BalancesArgs {
    /// An unsaved adjustment as ACCOUNT=AMOUNT, e.g. 財形貯蓄=-50000. May be repeated; repeated
    /// adjustments to the same account are added together.
    #[arg(long = "delta", allow_hyphen_values = true)]
    deltas: Vec<DeltaArg>,

    /// Also draw a bar chart of the current balances.
    #[arg(long)]
    chart: bool,

    /// Do not ask for a motivational comment.
    #[arg(long)]
    no_comment: bool,
}

impl BalancesArgs {
    pub fn deltas(&self) -> &[DeltaArg] {
        &self.deltas
    }

    pub fn chart(&self) -> bool {
        self.chart
    }

    pub fn no_comment(&self) -> bool {
        self.no_comment
    }
}

/// `ACCOUNT=AMOUNT` where `AMOUNT` may be negative.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeltaArg {
    account: String,
    amount: i64,
}

impl DeltaArg {
    pub fn new(account: impl Into<String>, amount: i64) -> Self {
        Self {
            account: account.into(),
            amount,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }
}

impl FromStr for DeltaArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, amount) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ACCOUNT=AMOUNT, got '{s}'"))?;
        let amount = Yen::from_str(amount).map_err(|e| e.to_string())?;
        Ok(Self {
            account: account.trim().to_string(),
            amount: amount.value(),
        })
    }
}

/// Output format for the transaction log.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A markdown table.
    #[default]
    Table,
    /// A JSON array of objects.
    Json,
    /// CSV with a header row.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);

/// Args for the `ledger log` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct LogArgs {
    /// The output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl LogArgs {
    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn default_ledger_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("asset-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --ledger-home or ASSET_LEDGER_HOME instead of relying on the \
                default ledger home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("asset-ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["ledger", "--ledger-home", "/tmp/ledger-test"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_record() {
        let args = parse(&["record", "預金", "¥5,000", "--kind", "liability"]);
        match args.command() {
            Command::Record(r) => {
                assert_eq!(r.account(), "預金");
                assert_eq!(r.amount().value(), 5000);
                assert_eq!(r.kind(), Kind::Liability);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_defaults_to_asset() {
        let args = parse(&["record", "社内積立", "30000"]);
        match args.command() {
            Command::Record(r) => assert_eq!(r.kind(), Kind::Asset),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_balances_with_negative_delta() {
        let args = parse(&["balances", "--delta", "財形貯蓄=-50000", "--chart"]);
        match args.command() {
            Command::Balances(b) => {
                assert_eq!(b.deltas(), &[DeltaArg::new("財形貯蓄", -50_000)]);
                assert!(b.chart());
                assert!(!b.no_comment());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_init_accounts() {
        let args = parse(&["init", "--account", "預金=1,000,000", "--account", "社内積立"]);
        match args.command() {
            Command::Init(i) => assert_eq!(
                i.accounts(),
                vec![
                    AccountConfig::new("預金", Some(1_000_000)),
                    AccountConfig::new("社内積立", None),
                ]
            ),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_init_defaults() {
        assert_eq!(InitArgs::new(Vec::new()).accounts(), AccountConfig::defaults());
    }

    #[test]
    fn test_parse_log_format() {
        let args = parse(&["log", "--format", "csv"]);
        match args.command() {
            Command::Log(l) => assert_eq!(l.format(), OutputFormat::Csv),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_delta_arg_requires_equals() {
        assert!(DeltaArg::from_str("預金").is_err());
        assert!(DeltaArg::from_str("預金=abc").is_err());
    }

    #[test]
    fn test_common_log_level() {
        let args = Args::try_parse_from(["ledger", "--log-level", "debug", "comment"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
    }
}
