//! Message builder for the marketplace's execute operations.
//!
//! Every operation is validated here so that a doomed message never costs a
//! fee: token ids must be non-empty, addresses well-formed, prices positive
//! `Uint128` strings, and time expirations in the future.
//!
//! Wire form is a single snake_case key wrapping the fields:
//!
//! ```json
//! {"create_order": {"token_id": "2", "nft_address": "terra1...", "price": {...}, "expire_at": {"at_time": "..."}}}
//! ```

use serde::{Serialize, Serializer};
use nftmx_crypto::validate_address;
use nftmx_types::{now_unix_secs, AssetInfo, AssetRef, Coin, Expiration, MarketError, Price, Result};

use crate::ContractCall;

const ORDER_MIN_LIFETIME_SECS: u64 = 60;

/// The closed set of marketplace operations, with the fields each one needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateOrder {
        asset: AssetRef,
        price: Price,
        expire_at: Expiration,
    },
    UpdateOrder {
        asset: AssetRef,
        price: Price,
        expire_at: Expiration,
    },
    CancelOrder {
        asset: AssetRef,
    },
    CreateBid {
        asset: AssetRef,
        price: Price,
        expire_at: Expiration,
    },
    CancelBid {
        asset: AssetRef,
    },
    AcceptBid {
        asset: AssetRef,
        price: Price,
    },
    /// Buy a listed NFT at its asking price.
    ExecuteOrder {
        asset: AssetRef,
        price: Price,
    },
    SetPaused {
        paused: bool,
    },
}

impl Operation {
    /// The top-level key of the execute message.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateOrder { .. } => "create_order",
            Operation::UpdateOrder { .. } => "update_order",
            Operation::CancelOrder { .. } => "cancel_order",
            Operation::CreateBid { .. } => "create_bid",
            Operation::CancelBid { .. } => "cancel_bid",
            Operation::AcceptBid { .. } => "accept_bid",
            Operation::ExecuteOrder { .. } => "safe_execute_order",
            Operation::SetPaused { .. } => "set_paused",
        }
    }

    pub fn asset(&self) -> Option<&AssetRef> {
        match self {
            Operation::CreateOrder { asset, .. }
            | Operation::UpdateOrder { asset, .. }
            | Operation::CancelOrder { asset }
            | Operation::CreateBid { asset, .. }
            | Operation::CancelBid { asset }
            | Operation::AcceptBid { asset, .. }
            | Operation::ExecuteOrder { asset, .. } => Some(asset),
            Operation::SetPaused { .. } => None,
        }
    }

    pub fn price(&self) -> Option<&Price> {
        match self {
            Operation::CreateOrder { price, .. }
            | Operation::UpdateOrder { price, .. }
            | Operation::CreateBid { price, .. }
            | Operation::AcceptBid { price, .. }
            | Operation::ExecuteOrder { price, .. } => Some(price),
            _ => None,
        }
    }

    pub fn expiration(&self) -> Option<&Expiration> {
        match self {
            Operation::CreateOrder { expire_at, .. }
            | Operation::UpdateOrder { expire_at, .. }
            | Operation::CreateBid { expire_at, .. } => Some(expire_at),
            _ => None,
        }
    }

    /// Native coins the contract expects alongside the message. Bids are
    /// escrowed, purchases are paid up front, and accepting a bid must carry
    /// the matching amount since the contract checks the sent balance.
    fn required_funds(&self) -> Vec<Coin> {
        match self {
            Operation::CreateBid { price, .. }
            | Operation::ExecuteOrder { price, .. }
            | Operation::AcceptBid { price, .. } => price.to_coin().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Listings must stay open at least a minute past the block that
    /// creates or updates them.
    fn min_lifetime_secs(&self) -> u64 {
        match self {
            Operation::CreateOrder { .. } | Operation::UpdateOrder { .. } => ORDER_MIN_LIFETIME_SECS,
            _ => 0,
        }
    }
}

/// A validated operation, ready to be wrapped into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltOperation {
    operation: Operation,
    funds: Vec<Coin>,
}

impl BuiltOperation {
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    pub fn funds(&self) -> &[Coin] {
        &self.funds
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| MarketError::Other(format!("failed to serialize {}: {}", self.name(), e)))
    }

    /// Address the operation to a marketplace contract instance.
    pub fn into_call(self, marketplace: &str) -> Result<ContractCall> {
        Ok(ContractCall {
            contract: marketplace.to_string(),
            msg: self.to_json()?,
            funds: self.funds,
        })
    }
}

impl Serialize for BuiltOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ExecuteMsg::from(&self.operation).serialize(serializer)
    }
}

/// Validate `operation` as of `now` (Unix seconds).
pub fn build(operation: Operation, now: u64) -> Result<BuiltOperation> {
    if let Some(asset) = operation.asset() {
        validate_asset(asset)?;
    }
    if let Some(price) = operation.price() {
        validate_price(price)?;
    }
    if let Some(expiration) = operation.expiration() {
        expiration.validate_lifetime(now, operation.min_lifetime_secs())?;
    }
    let funds = operation.required_funds();
    Ok(BuiltOperation { operation, funds })
}

/// [`build`] against the system clock.
pub fn build_now(operation: Operation) -> Result<BuiltOperation> {
    build(operation, now_unix_secs())
}

fn validate_asset(asset: &AssetRef) -> Result<()> {
    if asset.token_id.trim().is_empty() {
        return Err(MarketError::invalid("token_id must not be empty"));
    }
    validate_address(&asset.nft_address)
}

fn validate_price(price: &Price) -> Result<()> {
    match &price.info {
        AssetInfo::NativeToken { denom } => {
            if denom.trim().is_empty() {
                return Err(MarketError::invalid("price denom must not be empty"));
            }
        }
        AssetInfo::Token { contract_addr } => validate_address(contract_addr)?,
    }
    // the contract has no free listings or zero bids
    if price.amount_u128()? == 0 {
        return Err(MarketError::invalid("price amount must be greater than zero"));
    }
    Ok(())
}

/// Field-for-field mirror of the contract's `ExecuteMsg`.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum ExecuteMsg<'a> {
    SetPaused {
        paused: bool,
    },
    CreateOrder {
        token_id: &'a str,
        nft_address: &'a str,
        price: &'a Price,
        expire_at: &'a Expiration,
    },
    UpdateOrder {
        token_id: &'a str,
        nft_address: &'a str,
        price: &'a Price,
        expire_at: &'a Expiration,
    },
    CreateBid {
        token_id: &'a str,
        nft_address: &'a str,
        price: &'a Price,
        expire_at: &'a Expiration,
    },
    CancelOrder {
        token_id: &'a str,
        nft_address: &'a str,
    },
    CancelBid {
        token_id: &'a str,
        nft_address: &'a str,
    },
    SafeExecuteOrder {
        token_id: &'a str,
        nft_address: &'a str,
        price: &'a Price,
    },
    AcceptBid {
        token_id: &'a str,
        nft_address: &'a str,
        price: &'a Price,
    },
}

impl<'a> From<&'a Operation> for ExecuteMsg<'a> {
    fn from(op: &'a Operation) -> Self {
        match op {
            Operation::SetPaused { paused } => ExecuteMsg::SetPaused { paused: *paused },
            Operation::CreateOrder { asset, price, expire_at } => ExecuteMsg::CreateOrder {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
                price,
                expire_at,
            },
            Operation::UpdateOrder { asset, price, expire_at } => ExecuteMsg::UpdateOrder {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
                price,
                expire_at,
            },
            Operation::CreateBid { asset, price, expire_at } => ExecuteMsg::CreateBid {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
                price,
                expire_at,
            },
            Operation::CancelOrder { asset } => ExecuteMsg::CancelOrder {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
            },
            Operation::CancelBid { asset } => ExecuteMsg::CancelBid {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
            },
            Operation::AcceptBid { asset, price } => ExecuteMsg::AcceptBid {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
                price,
            },
            Operation::ExecuteOrder { asset, price } => ExecuteMsg::SafeExecuteOrder {
                token_id: &asset.token_id,
                nft_address: &asset.nft_address,
                price,
            },
        }
    }
}
