use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use fg_core::FocusLedger;
use fg_db::Database;
use tracing_subscriber::EnvFilter;

use fg_cli::commands::focus::FocusOptions;
use fg_cli::commands::util::report_warning;
use fg_cli::commands::{apps, coins, focus, history, permission, rewards, status, streak};
use fg_cli::{
    AppsAction, Blocker, Cli, CoinsAction, Commands, Config, RewardsAction, StreakAction,
};

/// Open the database (creating its directory) and load the ledger from it.
fn open_ledger(config: &Config) -> Result<FocusLedger<Database>> {
    if let Some(parent) = config
        .database_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let (ledger, warning) = FocusLedger::load(db, config.ledger_defaults());
    report_warning(warning.as_ref());
    Ok(ledger)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Status { json } => {
            let ledger = open_ledger(&config)?;
            status::run(&mut out, &ledger, *json)?;
        }
        Commands::Focus { minutes, seconds } => {
            let mut ledger = open_ledger(&config)?;
            let blocker = Blocker::from_config(&config)?;
            let options = FocusOptions::from_args(*minutes, *seconds, config.tick_interval());
            focus::run(&mut out, &mut ledger, blocker, options)?;
        }
        Commands::Coins(action) => {
            let mut ledger = open_ledger(&config)?;
            match action {
                CoinsAction::Earn { amount } => coins::earn(&mut out, &mut ledger, *amount)?,
                CoinsAction::Spend { amount } => coins::spend(&mut out, &mut ledger, *amount)?,
            }
        }
        Commands::Rewards(action) => match action {
            RewardsAction::List => rewards::list(&mut out, &open_ledger(&config)?)?,
            RewardsAction::Buy { id } => rewards::buy(&mut out, &mut open_ledger(&config)?, id)?,
        },
        Commands::Apps(action) => {
            let mut ledger = open_ledger(&config)?;
            match action {
                AppsAction::List => {
                    apps::list(&mut out, &ledger, Blocker::from_config(&config)?)?;
                }
                AppsAction::Toggle { app_id } => apps::toggle(&mut out, &mut ledger, app_id)?,
            }
        }
        Commands::Permission { request } => {
            permission::run(&mut out, Blocker::from_config(&config)?, *request)?;
        }
        Commands::Streak(StreakAction::Set { days }) => {
            streak::set(&mut out, &mut open_ledger(&config)?, *days)?;
        }
        Commands::History { limit, json } => {
            let ledger = open_ledger(&config)?;
            history::run(&mut out, ledger.store(), *limit, *json)?;
        }
    }

    out.flush()?;
    Ok(())
}
