//! Clearing-term arbitrage bot
//!
//! # Architecture
//! - **core**: decision logic (quote table, cost model, instruments)
//! - **engine**: tick stream -> table -> trigger -> dispatch
//! - **dispatch**: two-leg order lifecycle and budget accounting
//! - **broker**: account state, session auth, order entry REST
//! - **feed**: market-data / order-report push wire
//! - **ledger**: completed-leg records and CSV export
//! - **infrastructure**: cold path (config, logging)

use anyhow::Context;
use clap::Parser;
use clearing_arb::broker::{Account, Credentials, RestExecutionClient, Session};
use clearing_arb::core::instrument::format_instrument;
use clearing_arb::core::{CostModel, QuoteTable, Term};
use clearing_arb::dispatch::OrderDispatcher;
use clearing_arb::engine::ArbitrageEngine;
use clearing_arb::feed::run_feed;
use clearing_arb::infrastructure::{init_logging, Config};
use clearing_arb::{ledger, ArbError, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, RwLock};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "clearing-arb", about = "Cash-and-carry arbitrage over clearing terms")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Connect to the production environment (asks for confirmation)
    #[arg(long)]
    prod: bool,
}

/// Main application state
pub struct ArbApp {
    config: Config,
}

impl ArbApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Log in, wire the components, start the strategy and serve the
    /// operator shell until quit
    pub async fn run(&self) -> Result<()> {
        let config = &self.config;

        let credentials = Credentials::from_env()?;
        let session = Session::login(&config.venue, &credentials).await?;

        let account = Arc::new(Mutex::new(Account::new(
            config.account.budget,
            config.account.commission_pct,
            config.account.market_right_pct,
        )?));

        let (ledger_handle, ledger_store) = ledger::spawn(256);

        let dispatcher = OrderDispatcher::new(
            RestExecutionClient::new(session.clone()),
            account.clone(),
            ledger_handle,
        );

        let table = Arc::new(RwLock::new(QuoteTable::new()));
        let costs = CostModel::new(config.account.commission_pct, config.account.market_right_pct);
        let mut engine = ArbitrageEngine::new(
            table.clone(),
            costs,
            config.strategy.tna_expected,
            dispatcher,
            session.proprietary().to_string(),
            config.strategy.streaming,
        );

        // Every watched ticker under both settlement terms.
        let instruments: Vec<String> = config
            .strategy
            .tickers
            .iter()
            .flat_map(|t| {
                [
                    format_instrument(t, Term::Forward),
                    format_instrument(t, Term::Spot),
                ]
            })
            .collect();

        tracing::info!(
            tickers = config.strategy.tickers.len(),
            instruments = instruments.len(),
            tna_expected = %config.strategy.tna_expected,
            "starting strategy"
        );

        let (tx, rx) = mpsc::channel(1024);

        let feed_task = tokio::spawn(run_feed(
            session.ws_url().clone(),
            session.token().to_string(),
            instruments,
            session.account().to_string(),
            tx,
        ));

        let engine_task = tokio::spawn(async move { engine.run(rx).await });

        // Operator shell; the strategy keeps running while it waits.
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            println!("Commands: table | orders | budget | quit");
            let Ok(Some(line)) = lines.next_line().await else {
                break;
            };
            match line.trim() {
                "table" => {
                    let table = table.read().await;
                    print!("{}", *table);
                }
                "orders" => {
                    let records = ledger_store.lock();
                    if records.is_empty() {
                        println!("no orders sent yet");
                    }
                    for r in records.iter() {
                        println!(
                            "{} {} {} {} x {} @ {} (adj {}) tna {}",
                            r.recorded_at,
                            r.symbol,
                            r.term,
                            r.side,
                            r.size,
                            r.price,
                            r.cost_adjusted,
                            r.tna.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
                        );
                    }
                }
                "budget" => match account.lock().budget() {
                    Ok(b) => println!("Remaining budget: ${b}"),
                    Err(e) => println!("{e}"),
                },
                "quit" => {
                    feed_task.abort();
                    match account.lock().budget() {
                        Ok(b) => println!("Remaining budget: ${b}"),
                        Err(e) => println!("{e}"),
                    }
                    let path = PathBuf::from(ledger::EXPORT_FILE);
                    match ledger::export(&ledger_store, &path) {
                        Ok(n) => println!("Exported {n} records to {}", path.display()),
                        Err(e) => tracing::error!("export failed: {}", e),
                    }
                    break;
                }
                "" => {}
                other => println!("Invalid input '{other}', try again"),
            }
        }

        engine_task.abort();
        Ok(())
    }
}

/// Ask for an explicit confirmation before touching production
fn production_gate() -> bool {
    println!("Are you sure to connect to the production environment? Press 1 if you are sure");
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim() == "1"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guards = init_logging();

    let mut config =
        Config::load(&args.config).map_err(|e| ArbError::Config(e.to_string()))?;
    if args.prod {
        config.venue.prod = true;
    }
    config
        .validate()
        .map_err(|e| ArbError::Config(e.to_string()))?;

    if config.venue.prod && !production_gate() {
        anyhow::bail!("production connection not confirmed");
    }

    let app = ArbApp::new(config);
    app.run().await.context("strategy failed")?;

    Ok(())
}
