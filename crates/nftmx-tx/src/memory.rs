//! In-memory chain for testing.
//!
//! Behaves like a single-validator chain that includes every accepted
//! transaction immediately: account sequences are enforced, signatures are
//! verified against the sender, and contract execution can be made to fail
//! per action.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use nftmx_crypto::{address_from_public_key, verify_signature};
use nftmx_types::{MarketError, Result, TransportError};

use crate::broadcast::SEQUENCE_MISMATCH_CODE;
use crate::canonical::to_canonical_json;
use crate::{
    base64_decode, AccountInfo, Attribute, ChainRpc, Event, MsgExecuteContract, SignedTx,
    SubmitResponse, TxLog, TxMsg, TxResponse, UnsignedTx,
};

const UNAUTHORIZED_CODE: u32 = 4;
const INVALID_PUBKEY_CODE: u32 = 8;

#[derive(Debug, Clone)]
struct Failure {
    code: u32,
    codespace: String,
    raw_log: String,
}

struct Included {
    response: TxResponse,
    pending_polls: u32,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, AccountInfo>,
    next_account_number: u64,
    height: u64,
    txs: HashMap<String, Included>,
    executed: Vec<MsgExecuteContract>,
    broadcasts: u32,
}

impl State {
    fn account_entry(&mut self, address: &str) -> &mut AccountInfo {
        let next = &mut self.next_account_number;
        self.accounts.entry(address.to_string()).or_insert_with(|| {
            let info = AccountInfo { account_number: *next, sequence: 0 };
            *next += 1;
            info
        })
    }
}

/// In-memory [`ChainRpc`] (for tests and dry runs).
pub struct MemoryChain {
    state: Mutex<State>,
    simulated_gas: Option<u64>,
    failures: HashMap<String, Failure>,
    pending_polls: u32,
    queries: Vec<(String, Value, Value)>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            simulated_gas: Some(150_000),
            failures: HashMap::new(),
            pending_polls: 0,
            queries: Vec::new(),
        }
    }

    /// Gas reported by simulation; `None` makes simulation unavailable.
    pub fn with_simulated_gas(mut self, gas: Option<u64>) -> Self {
        self.simulated_gas = gas;
        self
    }

    /// Make every message with this action fail at execution.
    pub fn fail_action(mut self, action: &str, code: u32, codespace: &str, raw_log: &str) -> Self {
        self.failures.insert(
            action.to_string(),
            Failure {
                code,
                codespace: codespace.to_string(),
                raw_log: raw_log.to_string(),
            },
        );
        self
    }

    /// Number of query-by-hash polls that report "not yet included".
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn with_query_response(mut self, contract: &str, msg: Value, response: Value) -> Self {
        self.queries.push((contract.to_string(), msg, response));
        self
    }

    pub fn with_account(self, address: &str, info: AccountInfo) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.next_account_number = state.next_account_number.max(info.account_number + 1);
            state.accounts.insert(address.to_string(), info);
        }
        self
    }

    /// Contract messages that executed successfully, in order.
    pub fn executed(&self) -> Result<Vec<MsgExecuteContract>> {
        Ok(self.state()?.executed.clone())
    }

    /// Broadcast requests received, accepted or not.
    pub fn broadcast_count(&self) -> Result<u32> {
        Ok(self.state()?.broadcasts)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| MarketError::Other("memory chain state poisoned".to_string()))
    }

    /// The address the envelope's signature proves, or the CheckTx rejection.
    fn verify(&self, tx: &SignedTx) -> std::result::Result<String, Failure> {
        let reject = |code: u32, raw_log: &str| Failure {
            code,
            codespace: "sdk".to_string(),
            raw_log: raw_log.to_string(),
        };
        let sig = tx
            .signature()
            .ok_or_else(|| reject(UNAUTHORIZED_CODE, "no signatures supplied"))?;
        let public_key = base64_decode(&sig.pub_key.value)
            .ok_or_else(|| reject(INVALID_PUBKEY_CODE, "invalid public key encoding"))?;
        let signature = base64_decode(&sig.signature)
            .ok_or_else(|| reject(UNAUTHORIZED_CODE, "invalid signature encoding"))?;
        let bytes = tx
            .sign_bytes()
            .map_err(|e| reject(UNAUTHORIZED_CODE, &e.to_string()))?;
        if !verify_signature(&public_key, &bytes, &signature) {
            return Err(reject(UNAUTHORIZED_CODE, "signature verification failed"));
        }
        let signer = address_from_public_key(&public_key)
            .map_err(|_| reject(INVALID_PUBKEY_CODE, "invalid public key"))?;
        for TxMsg::ExecuteContract(msg) in &tx.tx().msg {
            if msg.sender != signer {
                return Err(reject(INVALID_PUBKEY_CODE, "pubKey does not match signer address"));
            }
        }
        Ok(signer)
    }

    fn execute(&self, msgs: &[TxMsg]) -> std::result::Result<Vec<TxLog>, Failure> {
        let mut logs = Vec::with_capacity(msgs.len());
        for (index, TxMsg::ExecuteContract(msg)) in msgs.iter().enumerate() {
            let action = msg
                .execute_msg
                .as_object()
                .and_then(|obj| obj.keys().next())
                .cloned()
                .unwrap_or_default();
            if let Some(failure) = self.failures.get(&action) {
                return Err(failure.clone());
            }
            let attr = |key: &str, value: &str| Attribute { key: key.to_string(), value: value.to_string() };
            logs.push(TxLog {
                msg_index: index as u32,
                log: String::new(),
                events: vec![
                    Event {
                        kind: "message".to_string(),
                        attributes: vec![
                            attr("action", "execute_contract"),
                            attr("module", "wasm"),
                            attr("sender", &msg.sender),
                        ],
                    },
                    Event {
                        kind: "execute_contract".to_string(),
                        attributes: vec![attr("sender", &msg.sender), attr("contract_address", &msg.contract)],
                    },
                    Event {
                        kind: "wasm".to_string(),
                        attributes: vec![attr("contract_address", &msg.contract), attr("action", &action)],
                    },
                ],
            });
        }
        Ok(logs)
    }
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

fn tx_hash(tx: &SignedTx) -> Result<String> {
    let canonical = to_canonical_json(tx.tx())?;
    Ok(hex::encode_upper(Sha256::digest(canonical.as_bytes())))
}

#[async_trait]
impl ChainRpc for MemoryChain {
    async fn account(&self, address: &str) -> Result<AccountInfo> {
        let mut state = self.state()?;
        Ok(*state.account_entry(address))
    }

    async fn simulate(&self, tx: &UnsignedTx) -> Result<u64> {
        if tx.msgs.is_empty() {
            return Err(TransportError::Status { status: 400, body: "empty transaction".to_string() }.into());
        }
        self.simulated_gas
            .map(|gas| gas * tx.msgs.len() as u64)
            .ok_or_else(|| TransportError::Unreachable("simulation unavailable".to_string()).into())
    }

    async fn broadcast(&self, tx: &SignedTx) -> Result<SubmitResponse> {
        let txhash = tx_hash(tx)?;
        let mut state = self.state()?;
        state.broadcasts += 1;

        let rejected = |f: Failure| SubmitResponse {
            txhash: txhash.clone(),
            code: f.code,
            codespace: f.codespace,
            raw_log: f.raw_log,
        };
        let signer = match self.verify(tx) {
            Ok(signer) => signer,
            Err(f) => return Ok(rejected(f)),
        };
        let account = state.account_entry(&signer);
        if tx.account_number() != account.account_number {
            let raw_log = format!(
                "signature verification failed; account number {} does not match {}",
                tx.account_number(),
                account.account_number
            );
            return Ok(rejected(Failure { code: UNAUTHORIZED_CODE, codespace: "sdk".to_string(), raw_log }));
        }
        if tx.sequence() != account.sequence {
            let raw_log = format!(
                "account sequence mismatch, expected {}, got {}: incorrect account sequence",
                account.sequence,
                tx.sequence()
            );
            return Ok(rejected(Failure { code: SEQUENCE_MISMATCH_CODE, codespace: "sdk".to_string(), raw_log }));
        }
        // the sequence is consumed once CheckTx passes, even if execution fails
        account.sequence += 1;
        state.height += 1;

        let gas_wanted = tx.tx().fee.gas;
        let response = match self.execute(&tx.tx().msg) {
            Ok(logs) => {
                for TxMsg::ExecuteContract(msg) in &tx.tx().msg {
                    state.executed.push(msg.clone());
                }
                TxResponse {
                    height: state.height,
                    txhash: txhash.clone(),
                    code: 0,
                    codespace: String::new(),
                    raw_log: "[]".to_string(),
                    logs,
                    gas_wanted,
                    gas_used: gas_wanted.min(self.simulated_gas.unwrap_or(gas_wanted)),
                }
            }
            Err(f) => TxResponse {
                height: state.height,
                txhash: txhash.clone(),
                code: f.code,
                codespace: f.codespace,
                raw_log: f.raw_log,
                logs: Vec::new(),
                gas_wanted,
                gas_used: gas_wanted,
            },
        };
        state.txs.insert(
            txhash.clone(),
            Included { response, pending_polls: self.pending_polls },
        );

        Ok(SubmitResponse {
            txhash,
            code: 0,
            codespace: String::new(),
            raw_log: "[]".to_string(),
        })
    }

    async fn tx_by_hash(&self, txhash: &str) -> Result<Option<TxResponse>> {
        let mut state = self.state()?;
        match state.txs.get_mut(txhash) {
            Some(included) if included.pending_polls > 0 => {
                included.pending_polls -= 1;
                Ok(None)
            }
            Some(included) => Ok(Some(included.response.clone())),
            None => Ok(None),
        }
    }

    async fn query_contract(&self, contract: &str, msg: &Value) -> Result<Value> {
        self.queries
            .iter()
            .find(|(addr, query, _)| addr == contract && query == msg)
            .map(|(_, _, response)| response.clone())
            .ok_or_else(|| {
                TransportError::Status {
                    status: 500,
                    body: format!("no response configured for query {} on {}", msg, contract),
                }
                .into()
            })
    }
}
