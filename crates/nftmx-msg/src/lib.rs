//! Marketplace contract messages.
//!
//! - `operation`: the eight execute operations, validated before anything is signed
//! - `query`: read-only contract queries and their typed responses
//! - `cw721`: the NFT hand-off that precedes a listing

use serde::{Deserialize, Serialize};
use nftmx_types::Coin;

pub mod cw721;
pub mod operation;
pub mod query;

pub use operation::{build, build_now, BuiltOperation, Operation};
pub use query::{Bid, Order, QueryMsg};

/// One contract execution: target contract, JSON message, attached funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: String,
    pub msg: serde_json::Value,
    pub funds: Vec<Coin>,
}
