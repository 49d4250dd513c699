//! Command-line interface definitions.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use nftmx_msg::Operation;
use nftmx_types::{AssetRef, Expiration, Price};

/// nftmx - submit and inspect NFTMX marketplace operations.
#[derive(Parser, Debug)]
#[command(name = "nftmx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nftmx.toml", global = true)]
    pub config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List an NFT for sale
    CreateOrder {
        #[command(flatten)]
        asset: AssetArgs,
        #[command(flatten)]
        price: PriceArgs,
        #[command(flatten)]
        expiration: ExpirationArgs,
        /// Transfer the NFT to the marketplace in the same transaction
        #[arg(long)]
        transfer_nft: bool,
    },

    /// Change the price or expiration of a listing
    UpdateOrder {
        #[command(flatten)]
        asset: AssetArgs,
        #[command(flatten)]
        price: PriceArgs,
        #[command(flatten)]
        expiration: ExpirationArgs,
    },

    /// Withdraw a listing
    CancelOrder {
        #[command(flatten)]
        asset: AssetArgs,
    },

    /// Bid on a listed NFT (the bid amount is escrowed)
    CreateBid {
        #[command(flatten)]
        asset: AssetArgs,
        #[command(flatten)]
        price: PriceArgs,
        #[command(flatten)]
        expiration: ExpirationArgs,
    },

    /// Withdraw a bid
    CancelBid {
        #[command(flatten)]
        asset: AssetArgs,
    },

    /// Accept the standing bid on your listing
    AcceptBid {
        #[command(flatten)]
        asset: AssetArgs,
        #[command(flatten)]
        price: PriceArgs,
    },

    /// Buy a listed NFT at the expected price
    ExecuteOrder {
        #[command(flatten)]
        asset: AssetArgs,
        #[command(flatten)]
        price: PriceArgs,
    },

    /// Pause or resume the marketplace (admin)
    SetPaused {
        /// true to pause, false to resume
        #[arg(action = ArgAction::Set)]
        paused: bool,
    },

    /// Show the listing for an NFT
    QueryOrder {
        #[command(flatten)]
        asset: AssetArgs,
    },

    /// Show the bid on an NFT
    QueryBid {
        #[command(flatten)]
        asset: AssetArgs,
    },

    /// Show the marketplace contract version
    Version,

    /// Show the signing address
    Address,
}

#[derive(Args, Debug, Clone)]
pub struct AssetArgs {
    /// NFT contract address
    #[arg(long)]
    pub nft: String,

    /// Token id on the NFT contract
    #[arg(long)]
    pub token_id: String,
}

impl AssetArgs {
    pub fn to_asset(&self) -> AssetRef {
        AssetRef::new(self.nft.clone(), self.token_id.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct PriceArgs {
    /// Amount in the smallest unit, e.g. 10000 for 0.01 LUNA
    #[arg(long)]
    pub price: String,

    /// Native denomination
    #[arg(long, default_value = "uluna")]
    pub denom: String,

    /// Price in a cw20 token instead of a native coin
    #[arg(long)]
    pub cw20: Option<String>,
}

impl PriceArgs {
    pub fn to_price(&self) -> Price {
        match &self.cw20 {
            Some(contract_addr) => Price::token(self.price.clone(), contract_addr.clone()),
            None => Price::native(self.price.clone(), self.denom.clone()),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExpirationArgs {
    /// Expire this many seconds from now
    #[arg(long, conflicts_with_all = ["expires_at", "expires_at_height"])]
    pub expires_in: Option<u64>,

    /// Expire at a Unix timestamp (seconds)
    #[arg(long, conflicts_with = "expires_at_height")]
    pub expires_at: Option<u64>,

    /// Expire at a block height
    #[arg(long)]
    pub expires_at_height: Option<u64>,
}

impl ExpirationArgs {
    /// Never expires when no flag is given.
    pub fn to_expiration(&self, now: u64) -> Expiration {
        if let Some(secs) = self.expires_in {
            Expiration::AtTime(now.saturating_add(secs))
        } else if let Some(at) = self.expires_at {
            Expiration::AtTime(at)
        } else if let Some(height) = self.expires_at_height {
            Expiration::AtHeight(height)
        } else {
            Expiration::Never
        }
    }
}

impl Commands {
    /// The marketplace operation this command submits, if any.
    pub fn operation(&self, now: u64) -> Option<Operation> {
        let op = match self {
            Commands::CreateOrder { asset, price, expiration, .. } => Operation::CreateOrder {
                asset: asset.to_asset(),
                price: price.to_price(),
                expire_at: expiration.to_expiration(now),
            },
            Commands::UpdateOrder { asset, price, expiration } => Operation::UpdateOrder {
                asset: asset.to_asset(),
                price: price.to_price(),
                expire_at: expiration.to_expiration(now),
            },
            Commands::CancelOrder { asset } => Operation::CancelOrder { asset: asset.to_asset() },
            Commands::CreateBid { asset, price, expiration } => Operation::CreateBid {
                asset: asset.to_asset(),
                price: price.to_price(),
                expire_at: expiration.to_expiration(now),
            },
            Commands::CancelBid { asset } => Operation::CancelBid { asset: asset.to_asset() },
            Commands::AcceptBid { asset, price } => Operation::AcceptBid {
                asset: asset.to_asset(),
                price: price.to_price(),
            },
            Commands::ExecuteOrder { asset, price } => Operation::ExecuteOrder {
                asset: asset.to_asset(),
                price: price.to_price(),
            },
            Commands::SetPaused { paused } => Operation::SetPaused { paused: *paused },
            Commands::QueryOrder { .. } | Commands::QueryBid { .. } | Commands::Version | Commands::Address => {
                return None
            }
        };
        Some(op)
    }
}
