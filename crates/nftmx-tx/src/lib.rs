//! Transaction assembly, signing and broadcast.
//!
//! - Wrap validated operations into an amino `StdTx` envelope
//! - Attach a fee from simulated or supplied gas
//! - Sign the canonical sign document with the account's sequence number
//! - Submit to the chain endpoint and wait for inclusion

use serde::{Deserialize, Serialize};
use nftmx_crypto::SigningIdentity;
use nftmx_msg::{BuiltOperation, ContractCall};
use nftmx_types::{Coin, MarketError, Result};

pub mod broadcast;
pub mod canonical;
pub mod chain;
pub mod fee;
pub mod lcd_client;
pub mod memory;

pub use broadcast::{broadcast, confirm, submit, ConfirmConfig};
pub use chain::{
    AccountInfo, Attribute, BroadcastResult, ChainRpc, Event, SubmitResponse, TxFailure, TxLog,
    TxResponse, TxSuccess,
};
pub use fee::{estimate_fee, FeeConfig};
pub use lcd_client::LcdClient;
pub use memory::MemoryChain;

pub const PUB_KEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// A message inside the envelope, in amino JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TxMsg {
    #[serde(rename = "wasm/MsgExecuteContract")]
    ExecuteContract(MsgExecuteContract),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgExecuteContract {
    pub sender: String,
    pub contract: String,
    pub execute_msg: serde_json::Value,
    pub coins: Vec<Coin>,
}

/// Fee attached to a transaction: total amount plus the gas limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    #[serde(with = "string_u64")]
    pub gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKey,
    pub signature: String,
}

/// The transaction body as broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<TxMsg>,
    pub fee: StdFee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
}

/// The document that gets signed. Field names are fixed by the chain.
#[derive(Serialize)]
struct StdSignDoc<'a> {
    account_number: String,
    chain_id: &'a str,
    fee: &'a StdFee,
    memo: &'a str,
    msgs: &'a [TxMsg],
    sequence: String,
}

/// Canonical bytes signed for a transaction.
pub fn sign_bytes(
    chain_id: &str,
    account_number: u64,
    sequence: u64,
    fee: &StdFee,
    msgs: &[TxMsg],
    memo: &str,
) -> Result<Vec<u8>> {
    let doc = StdSignDoc {
        account_number: account_number.to_string(),
        chain_id,
        fee,
        memo,
        msgs,
        sequence: sequence.to_string(),
    };
    Ok(canonical::to_canonical_json(&doc)?.into_bytes())
}

/// Messages from one sender, before account and fee details are known.
#[derive(Debug, Clone)]
pub struct TxDraft {
    sender: String,
    msgs: Vec<TxMsg>,
    memo: String,
}

impl TxDraft {
    /// Address every operation to the marketplace contract.
    pub fn from_operations(
        operations: Vec<BuiltOperation>,
        sender: &str,
        contract: &str,
    ) -> Result<Self> {
        let calls = operations
            .into_iter()
            .map(|op| op.into_call(contract))
            .collect::<Result<Vec<_>>>()?;
        Self::from_calls(calls, sender)
    }

    pub fn from_calls(calls: Vec<ContractCall>, sender: &str) -> Result<Self> {
        if calls.is_empty() {
            return Err(MarketError::invalid("a transaction needs at least one message"));
        }
        let msgs = calls
            .into_iter()
            .map(|call| {
                TxMsg::ExecuteContract(MsgExecuteContract {
                    sender: sender.to_string(),
                    contract: call.contract,
                    execute_msg: call.msg,
                    coins: call.funds,
                })
            })
            .collect();
        Ok(Self {
            sender: sender.to_string(),
            msgs,
            memo: String::new(),
        })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn msgs(&self) -> &[TxMsg] {
        &self.msgs
    }

    /// Bind the draft to a chain, an account state and a fee.
    pub fn assemble(self, chain_id: &str, account: AccountInfo, fee: StdFee) -> UnsignedTx {
        UnsignedTx {
            chain_id: chain_id.to_string(),
            account_number: account.account_number,
            sequence: account.sequence,
            fee,
            msgs: self.msgs,
            memo: self.memo,
        }
    }
}

/// Wrap operations for `contract` into an unsigned transaction from `sender`.
pub fn assemble(
    operations: Vec<BuiltOperation>,
    sender: &str,
    contract: &str,
    chain_id: &str,
    account: AccountInfo,
    fee: StdFee,
) -> Result<UnsignedTx> {
    Ok(TxDraft::from_operations(operations, sender, contract)?.assemble(chain_id, account, fee))
}

/// A fully specified transaction awaiting its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTx {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub fee: StdFee,
    pub msgs: Vec<TxMsg>,
    pub memo: String,
}

impl UnsignedTx {
    pub fn with_fee(mut self, fee: StdFee) -> Self {
        self.fee = fee;
        self
    }

    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        sign_bytes(
            &self.chain_id,
            self.account_number,
            self.sequence,
            &self.fee,
            &self.msgs,
            &self.memo,
        )
    }

    /// The body without signatures, as used for simulation.
    pub fn to_std_tx(&self) -> StdTx {
        StdTx {
            msg: self.msgs.clone(),
            fee: self.fee.clone(),
            signatures: Vec::new(),
            memo: self.memo.clone(),
        }
    }

    /// Sign once; the unsigned form is consumed.
    pub fn sign(self, identity: &SigningIdentity) -> Result<SignedTx> {
        let bytes = self.sign_bytes()?;
        let signature = identity.sign(&bytes);
        let std_sig = StdSignature {
            pub_key: PubKey {
                key_type: PUB_KEY_TYPE.to_string(),
                value: identity.public_key_base64(),
            },
            signature: base64_encode(&signature),
        };
        Ok(SignedTx {
            tx: StdTx {
                msg: self.msgs,
                fee: self.fee,
                signatures: vec![std_sig],
                memo: self.memo,
            },
            chain_id: self.chain_id,
            account_number: self.account_number,
            sequence: self.sequence,
        })
    }
}

/// A signed envelope bound to one account sequence number.
///
/// Not `Clone`: an envelope is submitted once and then dropped.
#[derive(Debug)]
pub struct SignedTx {
    tx: StdTx,
    chain_id: String,
    account_number: u64,
    sequence: u64,
}

impl SignedTx {
    pub fn tx(&self) -> &StdTx {
        &self.tx
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn account_number(&self) -> u64 {
        self.account_number
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn signature(&self) -> Option<&StdSignature> {
        self.tx.signatures.first()
    }

    /// Recompute the bytes the signature covers.
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        sign_bytes(
            &self.chain_id,
            self.account_number,
            self.sequence,
            &self.tx.fee,
            &self.tx.msg,
            &self.tx.memo,
        )
    }
}

pub(crate) fn base64_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(bytes)
}

pub(crate) fn base64_decode(s: &str) -> Option<Vec<u8>> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.decode(s).ok()
}

/// u64 as a JSON string (amino convention); numbers are accepted on input.
pub(crate) mod string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(u64),
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(n),
            Repr::Str(s) if s.is_empty() => Ok(0),
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
