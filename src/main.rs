//! Sponsored relay CLI.
//!
//! ```text
//!   relay balance ──► Horizon account read
//!   relay pay ──────► load sponsor → build → sign → submit → poll
//!   relay invoke ───► load sponsor → build → simulate → assemble → sign → submit → poll
//!   relay call ─────► load sponsor → build → simulate → decode   (nothing submitted)
//!   relay health ───► RPC getHealth
//! ```
//!
//! The sponsor secret is read from the environment variable named in the
//! configuration (`RELAY_SPONSOR_SECRET` by default).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use sponsored_relay::ledger::args::ContractArg;
use sponsored_relay::ledger::types::RelayError;
use sponsored_relay::lifecycle::signals::spawn_ctrl_c_handler;
use sponsored_relay::lifecycle::startup::{build_gateway, build_relay, init_observability, load_or_default};
use sponsored_relay::lifecycle::Shutdown;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Fee-sponsored transaction relay", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults target testnet.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show an account's balance in one asset
    Balance {
        address: String,
        #[arg(long, default_value = "native")]
        asset: String,
        #[arg(long)]
        issuer: Option<String>,
    },
    /// Send a sponsored payment and wait for confirmation
    Pay {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        issuer: Option<String>,
    },
    /// Invoke a contract function as `source`, sponsored, and wait for confirmation
    Invoke {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        function: String,
        #[arg(long)]
        source: String,
        /// Tagged JSON argument, e.g. '{"type":"u32","value":5}'; repeatable
        #[arg(long = "arg")]
        args: Vec<String>,
    },
    /// Simulate a read-only contract call and print its return value
    Call {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        function: String,
        #[arg(long = "arg")]
        args: Vec<String>,
    },
    /// Check RPC health
    Health,
}

fn parse_args(raw: &[String]) -> Result<Vec<ContractArg>, RelayError> {
    raw.iter().map(|a| ContractArg::from_json(a)).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_or_default(cli.config.as_deref())?;
    init_observability(&config)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relay starting");

    let gateway = build_gateway(&config)?;
    let relay = || build_relay(&config, gateway.clone());

    let shutdown = Arc::new(Shutdown::new());
    spawn_ctrl_c_handler(shutdown.clone());

    let output = match cli.command {
        Commands::Health => {
            let healthy = gateway.is_healthy().await;
            println!("{}", json!({ "healthy": healthy }));
            if !healthy {
                std::process::exit(1);
            }
            return Ok(());
        }
        Commands::Balance {
            address,
            asset,
            issuer,
        } => {
            let balance = relay()?
                .get_account_balance(&address, &asset, issuer.as_deref())
                .await?;
            json!({ "address": address, "asset": asset, "balance": balance })
        }
        Commands::Pay {
            from,
            to,
            amount,
            asset,
            issuer,
        } => {
            let confirmation = relay()?
                .pay_and_confirm(
                    &from,
                    &to,
                    &amount,
                    asset.as_deref(),
                    issuer.as_deref(),
                    shutdown.token(),
                )
                .await?;
            json!({
                "hash": confirmation.hash,
                "ledger": confirmation.ledger,
                "close_time": confirmation.close_time,
            })
        }
        Commands::Invoke {
            contract,
            function,
            source,
            args,
        } => {
            let args = parse_args(&args)?;
            let confirmation = relay()?
                .invoke_and_confirm(&contract, &function, &args, &source, shutdown.token())
                .await?;
            json!({
                "hash": confirmation.hash,
                "ledger": confirmation.ledger,
                "close_time": confirmation.close_time,
                "return_value": confirmation.return_value.map(|v| v.to_json()),
                "return_value_error": confirmation.return_value_error,
            })
        }
        Commands::Call {
            contract,
            function,
            args,
        } => {
            let args = parse_args(&args)?;
            let value = relay()?
                .simulate_read_only_call(&contract, &function, &args)
                .await?;
            json!({ "return_value": value.map(|v| v.to_json()) })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
