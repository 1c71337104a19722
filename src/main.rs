use asset_ledger::args::{Args, Command};
use asset_ledger::{commands, Config, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().ledger_home().path();
    let api_key = args.common().api_key();

    // When ASSET_LEDGER_IN_TEST_MODE is set and non-empty the mode is Mode::Testing and no comment
    // requests leave the machine.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.accounts()).await?.print(),

        Command::Record(record_args) => {
            let config = Config::load(home).await?;
            commands::record(
                &config,
                record_args.account(),
                record_args.amount(),
                record_args.kind(),
            )
            .await?
            .print()
        }

        Command::Balances(balances_args) => {
            let config = Config::load(home).await?;
            commands::balances(
                &config,
                balances_args.deltas(),
                balances_args.chart(),
                balances_args.no_comment(),
                api_key,
                mode,
            )
            .await?
            .print()
        }

        Command::Log(log_args) => {
            let config = Config::load(home).await?;
            commands::log(&config, log_args.format()).await?.print()
        }

        Command::Comment => {
            let config = Config::load(home).await?;
            commands::comment(&config, api_key, mode).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the library and binary only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
