//! Command execution.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use nftmx_crypto::SigningIdentity;
use nftmx_ops::{MarketClient, Report, TxEvent};
use nftmx_types::now_unix_secs;

use crate::cli::{Cli, Commands};
use crate::config::Config;

/// Run one command. Returns whether the outcome was a success.
pub async fn run(cli: &Cli, config: &Config) -> anyhow::Result<bool> {
    let identity = Arc::new(config.wallet.identity().context("loading signing identity")?);

    if let Commands::Address = cli.command {
        print_value(cli.json, &serde_json::json!({ "address": identity.address() }), identity.address());
        return Ok(true);
    }

    let client = connect(config, identity).await?;

    match &cli.command {
        Commands::Version => {
            let version = client.version().await?;
            print_value(cli.json, &serde_json::json!({ "version": version }), &version);
            Ok(true)
        }
        Commands::QueryOrder { asset } => {
            let order = client.query_order(&asset.to_asset()).await?;
            print_json(&order)?;
            Ok(true)
        }
        Commands::QueryBid { asset } => {
            let bid = client.query_bid(&asset.to_asset()).await?;
            print_json(&bid)?;
            Ok(true)
        }
        Commands::CreateOrder { asset, price, expiration, transfer_nft: true } => {
            let outcome = client
                .create_order_with_transfer(asset.to_asset(), price.to_price(), expiration.to_expiration(now_unix_secs()))
                .await;
            Ok(report(cli.json, &Report::from_outcome(&outcome)))
        }
        command => {
            let operation = command
                .operation(now_unix_secs())
                .context("command does not submit an operation")?;
            info!(operation = operation.name(), sender = client.address(), "submitting");
            let outcome = client.execute(operation).await;
            Ok(report(cli.json, &Report::from_outcome(&outcome)))
        }
    }
}

async fn connect(config: &Config, identity: Arc<SigningIdentity>) -> anyhow::Result<MarketClient> {
    let network = nftmx_network::resolve(&config.network).await?;
    let client = MarketClient::connect(&network, &config.marketplace.address, identity)?
        .with_fee_config(config.fee.to_fee_config(&network))?
        .with_confirm_config((&config.confirm).into())?
        .with_event_handler(Box::new(log_event));
    Ok(client)
}

fn log_event(event: TxEvent) {
    match &event {
        TxEvent::Submitted { txhash, sequence } => info!(%txhash, sequence, "submitted, waiting for inclusion"),
        other => info!(state = ?other.state(), "transaction progress"),
    }
}

fn report(json: bool, report: &Report) -> bool {
    if json {
        println!("{}", report.to_json());
    } else {
        println!("{}", report);
    }
    report.is_success()
}

fn print_value(json: bool, value: &serde_json::Value, plain: &str) {
    if json {
        println!("{}", value);
    } else {
        println!("{}", plain);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
