//! The chain RPC boundary and execution result classification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use nftmx_types::{MarketError, Result};

use crate::{string_u64, SignedTx, UnsignedTx};

/// Account number and next expected sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(with = "string_u64")]
    pub account_number: u64,
    #[serde(with = "string_u64")]
    pub sequence: u64,
}

/// Immediate answer to a broadcast: accepted into the mempool or rejected
/// before execution (`code != 0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub raw_log: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLog {
    #[serde(default)]
    pub msg_index: u32,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A transaction as found on chain after inclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    #[serde(with = "string_u64")]
    pub height: u64,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub raw_log: String,
    #[serde(default)]
    pub logs: Vec<TxLog>,
    #[serde(default, with = "string_u64")]
    pub gas_wanted: u64,
    #[serde(default, with = "string_u64")]
    pub gas_used: u64,
}

/// The operations this client needs from a chain endpoint.
///
/// Implementations must bound every call with a timeout and report it as
/// `TransportError::Timeout`.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn account(&self, address: &str) -> Result<AccountInfo>;

    /// Dry-run the transaction and return the gas it used. Never mutates state.
    async fn simulate(&self, tx: &UnsignedTx) -> Result<u64>;

    async fn broadcast(&self, tx: &SignedTx) -> Result<SubmitResponse>;

    /// `None` until the transaction is included in a block.
    async fn tx_by_hash(&self, txhash: &str) -> Result<Option<TxResponse>>;

    async fn query_contract(&self, contract: &str, msg: &serde_json::Value) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxSuccess {
    pub txhash: String,
    pub height: u64,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub logs: Vec<TxLog>,
}

impl TxSuccess {
    /// Attribute values grouped by event type and key, across all messages.
    pub fn events_by_type(&self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        let mut grouped: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for event in self.logs.iter().flat_map(|log| log.events.iter()) {
            let by_key = grouped.entry(event.kind.clone()).or_default();
            for attr in &event.attributes {
                by_key.entry(attr.key.clone()).or_default().push(attr.value.clone());
            }
        }
        grouped
    }

    /// First value of `key` on an event of type `kind`.
    pub fn attribute(&self, kind: &str, key: &str) -> Option<&str> {
        self.logs
            .iter()
            .flat_map(|log| log.events.iter())
            .filter(|event| event.kind == kind)
            .flat_map(|event| event.attributes.iter())
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxFailure {
    pub txhash: String,
    pub height: u64,
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
}

/// Terminal outcome of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BroadcastResult {
    Success(TxSuccess),
    Failure(TxFailure),
}

impl BroadcastResult {
    /// `code == 0` is success; anything else is an execution failure with
    /// `code` and `codespace` preserved.
    pub fn classify(resp: TxResponse) -> Self {
        if resp.code == 0 {
            BroadcastResult::Success(TxSuccess {
                txhash: resp.txhash,
                height: resp.height,
                gas_wanted: resp.gas_wanted,
                gas_used: resp.gas_used,
                logs: resp.logs,
            })
        } else {
            BroadcastResult::Failure(TxFailure {
                txhash: resp.txhash,
                height: resp.height,
                code: resp.code,
                codespace: resp.codespace,
                raw_log: resp.raw_log,
            })
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BroadcastResult::Success(_))
    }

    pub fn txhash(&self) -> &str {
        match self {
            BroadcastResult::Success(s) => &s.txhash,
            BroadcastResult::Failure(f) => &f.txhash,
        }
    }

    /// Turn an execution failure into `MarketError::ContractExecution`.
    pub fn into_result(self) -> Result<TxSuccess> {
        match self {
            BroadcastResult::Success(s) => Ok(s),
            BroadcastResult::Failure(f) => Err(MarketError::ContractExecution {
                code: f.code,
                codespace: f.codespace,
                raw_log: f.raw_log,
                txhash: f.txhash,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn included(code: u32, codespace: &str) -> TxResponse {
        serde_json::from_value(json!({
            "height": "7384",
            "txhash": "A1B2",
            "code": code,
            "codespace": codespace,
            "raw_log": "failed to execute message; message index: 0: Marketplace: paused",
            "logs": [{
                "msg_index": 0,
                "log": "",
                "events": [
                    {"type": "wasm", "attributes": [
                        {"key": "contract_address", "value": "terra1d0n6e9k666xurqej0j0tl0znkwzrnqr8sayx37"},
                        {"key": "action", "value": "create_order"}
                    ]},
                    {"type": "message", "attributes": [{"key": "action", "value": "execute_contract"}]}
                ]
            }],
            "gas_wanted": "200000",
            "gas_used": "151234"
        }))
        .unwrap()
    }

    #[test]
    fn test_zero_code_is_success() {
        let result = BroadcastResult::classify(included(0, ""));
        assert!(result.is_success());
        assert_eq!(result.txhash(), "A1B2");
        let success = result.into_result().unwrap();
        assert_eq!(success.height, 7384);
        assert_eq!(success.gas_used, 151_234);
        assert_eq!(success.attribute("wasm", "action"), Some("create_order"));
        let grouped = success.events_by_type();
        assert_eq!(grouped["message"]["action"], vec!["execute_contract".to_string()]);
    }

    #[test]
    fn test_nonzero_code_is_execution_failure() {
        let result = BroadcastResult::classify(included(5, "wasm"));
        match &result {
            BroadcastResult::Failure(f) => {
                assert_eq!(f.code, 5);
                assert_eq!(f.codespace, "wasm");
                assert!(f.raw_log.contains("paused"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        match result.into_result() {
            Err(MarketError::ContractExecution { code, codespace, txhash, .. }) => {
                assert_eq!((code, codespace.as_str(), txhash.as_str()), (5, "wasm", "A1B2"));
            }
            other => panic!("expected contract execution error, got {:?}", other),
        }
    }

    #[test]
    fn test_tx_response_defaults() {
        let resp: TxResponse = serde_json::from_value(json!({"height": "1", "txhash": "FF"})).unwrap();
        assert_eq!(resp.code, 0);
        assert!(resp.logs.is_empty());
        assert_eq!(resp.gas_used, 0);
    }
}
