use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use stockfolio_connect::{IngestionPipeline, TokenStore};
use stockfolio_core::accounts::AccountRepositoryTrait;
use stockfolio_core::analytics::AnalyticsServiceTrait;
use stockfolio_core::config::DEFAULT_CONFIG_PATH;
use stockfolio_core::sync::{AccountCollectionOutcome, RunStatus};
use stockfolio_core::utils::time_utils::market_date_today;

use crate::context::{build_analytics, build_pipeline, load_config, open_stores, Stores};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stockfolio brokerage data collector")]
pub struct Cli {
    /// Path of the JSON configuration file
    #[arg(long, global = true, env = "STOCKFOLIO_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect balances and holdings of every account
    Collect,
    /// Collect balance and holdings of a single account
    CollectAccount(AccountArgs),
    /// Register or refresh broker accounts in the store
    SyncAccounts,
    /// Append executed transactions of an account
    Transactions(TransactionArgs),
    /// Inspect or remove stored access tokens
    Tokens {
        #[command(subcommand)]
        action: TokenCommand,
    },
    /// Show registered brokers and their connection state
    Brokers,
    /// Report aggregates computed from stored data
    Analyze {
        #[command(subcommand)]
        report: AnalyzeCommand,
    },
}

#[derive(Args, Debug)]
pub struct AccountArgs {
    broker: String,
    account: String,
    /// Balance date (YYYY-MM-DD); defaults to today in the market time zone
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct TransactionArgs {
    broker: String,
    account: String,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
}

#[derive(Subcommand, Debug)]
pub enum AnalyzeCommand {
    /// Balance and trading summary of one calendar month
    Monthly {
        account: String,
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
    /// Trading performance of one symbol
    Stock {
        account: String,
        symbol: String,
        /// Reference day for open positions; defaults to today in the market time zone
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Composition and return of an account on one day
    Portfolio {
        account: String,
        /// Defaults to today in the market time zone
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// List token state for every broker scope
    List,
    /// Delete the current token of a broker
    Delete { broker: String },
    /// Reset a broker's token scope
    Clear { broker: String },
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli.config)?;

    match &cli.command {
        Commands::Tokens { action } => return run_tokens(&config.token_dir, action),
        Commands::Analyze { report } => return run_analyze(&open_stores(&config)?, report),
        _ => {}
    }

    let pipeline = build_pipeline(&config)?;
    let result = run_with_pipeline(&pipeline, cli.command).await;
    pipeline.registry().close_all().await;
    result
}

async fn run_with_pipeline(
    pipeline: &IngestionPipeline,
    command: Commands,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Collect => {
            let summary = pipeline.collect_all_accounts().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(match summary.status {
                RunStatus::Failed => ExitCode::FAILURE,
                RunStatus::Skipped => {
                    warn!("No listed account is registered; run `stockfolio sync-accounts` first");
                    ExitCode::FAILURE
                }
                _ => ExitCode::SUCCESS,
            })
        }
        Commands::CollectAccount(args) => {
            let outcome = match args.date {
                Some(date) => {
                    pipeline
                        .collect_account_data_on(&args.broker, &args.account, date)
                        .await
                }
                None => pipeline.collect_account_data(&args.broker, &args.account).await,
            }
            .with_context(|| format!("collecting {}/{}", args.broker, args.account))?;

            if outcome == AccountCollectionOutcome::Skipped {
                info!("Account {} is not registered; run sync-accounts first", args.account);
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::SyncAccounts => {
            let registered = pipeline.register_accounts().await;
            println!("{}", serde_json::to_string_pretty(&registered)?);
            Ok(if registered.failed > 0 && registered.created + registered.updated == 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Transactions(args) => {
            if args.from > args.to {
                bail!("--from {} is after --to {}", args.from, args.to);
            }
            let inserted = pipeline
                .collect_transaction_data(&args.broker, &args.account, args.from, args.to)
                .await
                .with_context(|| format!("fetching transactions for {}", args.account))?;
            println!("{inserted} transaction(s) stored");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Brokers => {
            let registry = pipeline.registry();
            for name in registry.names() {
                if let Err(e) = registry.connect(&name).await {
                    info!("[{}] connect failed: {}", name, e);
                }
            }
            println!("{}", serde_json::to_string_pretty(&registry.broker_info())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tokens { .. } | Commands::Analyze { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn run_analyze(stores: &Stores, report: &AnalyzeCommand) -> anyhow::Result<ExitCode> {
    let account_id = |number: &str| -> anyhow::Result<String> {
        match stores.accounts.find_by_number(number)? {
            Some(account) => Ok(account.id),
            None => bail!("account {number} is not registered; run sync-accounts first"),
        }
    };
    let analytics = build_analytics(stores);

    let report = match report {
        AnalyzeCommand::Monthly {
            account,
            year,
            month,
        } => analytics
            .monthly_summary(&account_id(account)?, *year, *month)?
            .map(|summary| serde_json::to_string_pretty(&summary))
            .transpose()?,
        AnalyzeCommand::Stock {
            account,
            symbol,
            as_of,
        } => analytics
            .stock_performance(
                &account_id(account)?,
                symbol,
                as_of.unwrap_or_else(market_date_today),
            )?
            .map(|performance| serde_json::to_string_pretty(&performance))
            .transpose()?,
        AnalyzeCommand::Portfolio { account, date } => analytics
            .portfolio_analysis(&account_id(account)?, date.unwrap_or_else(market_date_today))?
            .map(|analysis| serde_json::to_string_pretty(&analysis))
            .transpose()?,
    };

    match report {
        Some(json) => {
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            warn!("No stored data for the requested report");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_tokens(token_dir: &std::path::Path, action: &TokenCommand) -> anyhow::Result<ExitCode> {
    match action {
        TokenCommand::List => {
            let scopes = TokenStore::list_scopes(token_dir)?;
            if scopes.is_empty() {
                println!("No token scopes in {}", token_dir.display());
            }
            for scope in scopes {
                let store = TokenStore::open(token_dir, &scope)?;
                match store.expiry_info() {
                    Some(info) => println!("{scope}: {}", serde_json::to_string(&info)?),
                    None => println!("{scope}: no token"),
                }
            }
        }
        TokenCommand::Delete { broker } => {
            TokenStore::open(token_dir, broker)?.delete()?;
            println!("Deleted token for {broker}");
        }
        TokenCommand::Clear { broker } => {
            TokenStore::open(token_dir, broker)?.clear_all()?;
            println!("Cleared tokens for {broker}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transactions_command() {
        let cli = Cli::try_parse_from([
            "stockfolio",
            "--config",
            "/etc/stockfolio.json",
            "transactions",
            "kis",
            "5012345601",
            "--from",
            "2024-06-01",
            "--to",
            "2024-06-30",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/stockfolio.json"));
        match cli.command {
            Commands::Transactions(args) => {
                assert_eq!(args.broker, "kis");
                assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_token_subcommands() {
        let cli = Cli::try_parse_from(["stockfolio", "tokens", "delete", "kis"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tokens { action: TokenCommand::Delete { ref broker } } if broker == "kis"
        ));

        assert!(Cli::try_parse_from(["stockfolio", "collect-account", "kis"]).is_err());
        assert!(Cli::try_parse_from(["stockfolio", "collect-account", "kis", "5012345601", "--date", "June"]).is_err());
    }

    #[test]
    fn test_parse_analyze_commands() {
        let cli = Cli::try_parse_from([
            "stockfolio", "analyze", "monthly", "5012345601", "--year", "2024", "--month", "6",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Analyze { report: AnalyzeCommand::Monthly { year: 2024, month: 6, .. } }
        ));

        assert!(Cli::try_parse_from([
            "stockfolio", "analyze", "monthly", "5012345601", "--year", "2024", "--month", "13",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["stockfolio", "analyze", "stock", "5012345601"]).is_err());
    }

    #[tokio::test]
    async fn test_analyze_reads_the_store() {
        use stockfolio_core::accounts::AccountSnapshot;
        use stockfolio_core::balances::{BalanceRepositoryTrait, BalanceSnapshot};
        use stockfolio_core::config::AppConfig;

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("stockfolio.db");
        let stores = open_stores(&config).unwrap();

        let (account, _) = stores
            .accounts
            .upsert_from_snapshot(AccountSnapshot::new("5012345601", "", "", "kis"))
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        stores
            .balances
            .upsert_daily_balance(&account.id, day, BalanceSnapshot::default())
            .await
            .unwrap();

        let portfolio = |date: NaiveDate| AnalyzeCommand::Portfolio {
            account: "5012345601".to_string(),
            date: Some(date),
        };
        assert_eq!(run_analyze(&stores, &portfolio(day)).unwrap(), ExitCode::SUCCESS);
        assert_eq!(
            run_analyze(&stores, &portfolio(day.pred_opt().unwrap())).unwrap(),
            ExitCode::FAILURE
        );

        let unregistered = AnalyzeCommand::Monthly {
            account: "9999999999".to_string(),
            year: 2024,
            month: 6,
        };
        assert!(run_analyze(&stores, &unregistered).is_err());
    }

    #[test]
    fn test_token_commands_operate_on_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::open(dir.path(), "kis").unwrap();
        store.save("abc", None, 3600).unwrap();

        run_tokens(dir.path(), &TokenCommand::List).unwrap();
        run_tokens(dir.path(), &TokenCommand::Delete { broker: "kis".into() }).unwrap();
        assert!(store.get_token().is_none());
        run_tokens(dir.path(), &TokenCommand::Clear { broker: "kis".into() }).unwrap();
    }
}
