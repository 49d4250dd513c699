//! Asset references, prices and coins.
//!
//! `Price` serializes to the terraswap `Asset` shape the marketplace contract
//! expects:
//!
//! ```json
//! {"info": {"native_token": {"denom": "uluna"}}, "amount": "10000"}
//! ```

use serde::{Deserialize, Serialize};

use crate::{parse_uint128, Result};

/// An NFT: the cw721 contract address plus the token id on that contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub nft_address: String,
    pub token_id: String,
}

impl AssetRef {
    pub fn new(nft_address: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            nft_address: nft_address.into(),
            token_id: token_id.into(),
        }
    }
}

/// Denomination of a price.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetInfo {
    /// A cw20 fungible-token contract.
    Token { contract_addr: String },
    /// The chain's native currency, e.g. `uluna`.
    NativeToken { denom: String },
}

/// An amount in smallest-denomination units plus its denomination.
///
/// The amount stays a decimal string end to end so large values never pass
/// through a floating type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub info: AssetInfo,
    pub amount: String,
}

impl Price {
    pub fn native(amount: impl Into<String>, denom: impl Into<String>) -> Self {
        Self {
            info: AssetInfo::NativeToken { denom: denom.into() },
            amount: amount.into(),
        }
    }

    pub fn token(amount: impl Into<String>, contract_addr: impl Into<String>) -> Self {
        Self {
            info: AssetInfo::Token {
                contract_addr: contract_addr.into(),
            },
            amount: amount.into(),
        }
    }

    pub fn amount_u128(&self) -> Result<u128> {
        parse_uint128(&self.amount)
    }

    /// The coin that has to accompany this price when it is paid in native currency.
    pub fn to_coin(&self) -> Option<Coin> {
        match &self.info {
            AssetInfo::NativeToken { denom } => Some(Coin::new(denom.clone(), self.amount.clone())),
            AssetInfo::Token { .. } => None,
        }
    }
}

/// A native coin amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}
