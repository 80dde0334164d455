//! farmscope - referral-farm operator CLI
//!
//! Queries farms through the configured indexer quorum, looks up reward
//! proofs and APR at the verifier, and builds transaction call data.
//! Results are printed as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farmscope_indexer::config::{Config, LoggingConfig};
use farmscope_indexer::DecodeMode;
use std::path::PathBuf;

mod cmd;

#[derive(Debug, Parser)]
#[command(name = "farmscope")]
#[command(version, about = "Referral-farm indexer quorum and verifier CLI", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "farmscope.toml", env = "FARMSCOPE_CONFIG")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Skip undecodable logs instead of failing the query
    #[arg(long, global = true)]
    best_effort: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild every farm from its events.
    Farms(cmd::farms::FarmsArgs),
    /// Farms created by one sponsor.
    MyFarms(cmd::farms::MyFarmsArgs),
    /// Farms for a referred or reward token.
    TokenFarms(cmd::farms::TokenFarmsArgs),
    /// All deposit changes.
    Deposits,
    /// Reward proofs issued to an account.
    Proofs(cmd::verifier::ProofsArgs),
    /// Farm APR figures.
    Apr(cmd::verifier::AprArgs),
    /// Referral link time promise and proof submission.
    #[command(subcommand)]
    Link(cmd::verifier::LinkCommand),
    /// Print event names, signatures and topic hashes.
    Topics,
    /// Build farm transaction call data.
    #[command(subcommand)]
    Calldata(cmd::calldata::CalldataCommand),
    /// Evaluate the wallet/network gate for an action.
    Boundary(cmd::boundary::BoundaryArgs),
}

impl Command {
    fn needs_config(&self) -> bool {
        !matches!(
            self,
            Command::Topics | Command::Calldata(_) | Command::Boundary(_)
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.command.needs_config() {
        let mut config = Config::from_file(&cli.config).context("Failed to load configuration")?;
        if cli.best_effort {
            config.quorum.decode_mode = DecodeMode::BestEffort;
        }
        Some(config)
    } else {
        None
    };

    init_logging(config.as_ref().map(|c| &c.logging), cli.debug)?;

    match (cli.command, config) {
        (Command::Topics, _) => cmd::topics::run()?,
        (Command::Calldata(command), _) => cmd::calldata::run(command)?,
        (Command::Boundary(args), _) => cmd::boundary::run(args)?,
        (command, Some(config)) => run_with_config(command, &config).await?,
        (_, None) => anyhow::bail!("Configuration required"),
    }

    Ok(())
}

async fn run_with_config(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Farms(args) => cmd::farms::run_farms(config, args).await,
        Command::MyFarms(args) => cmd::farms::run_my_farms(config, args).await,
        Command::TokenFarms(args) => cmd::farms::run_token_farms(config, args).await,
        Command::Deposits => cmd::farms::run_deposits(config).await,
        Command::Proofs(args) => cmd::verifier::run_proofs(config, args).await,
        Command::Apr(args) => cmd::verifier::run_apr(config, args).await,
        Command::Link(command) => cmd::verifier::run_link(config, command).await,
        Command::Topics | Command::Calldata(_) | Command::Boundary(_) => Ok(()),
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: Option<&LoggingConfig>, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = logging.map(|l| l.level.as_str()).unwrap_or("warn");
    let env_filter = if debug {
        EnvFilter::new("farmscope=debug,farmscope_indexer=debug,farmscope_verifier=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "farmscope={level},farmscope_indexer={level},farmscope_verifier={level}"
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.is_some_and(|l| l.format == "json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}
