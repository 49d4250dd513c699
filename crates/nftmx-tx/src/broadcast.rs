//! Submission and confirmation.
//!
//! Flow:
//! 1. `submit`: sync broadcast; a CheckTx rejection is a transport failure
//!    (sequence mismatch recognized separately)
//! 2. `confirm`: poll query-by-hash until the transaction is included, then
//!    classify by result code
//!
//! The signed envelope is never resubmitted here.

use nftmx_types::{Result, TransportError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{BroadcastResult, ChainRpc, SignedTx};

/// CheckTx code for a wrong account sequence, in codespace `sdk`.
pub const SEQUENCE_MISMATCH_CODE: u32 = 32;

/// Polling schedule for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 30,
        }
    }
}

/// Submit the envelope and return its hash once the chain accepted it.
pub async fn submit(chain: &dyn ChainRpc, tx: &SignedTx) -> Result<String> {
    let resp = chain.broadcast(tx).await?;
    if resp.code == 0 {
        info!(txhash = %resp.txhash, sequence = tx.sequence(), "transaction accepted");
        return Ok(resp.txhash);
    }
    warn!(
        code = resp.code,
        codespace = %resp.codespace,
        sequence = tx.sequence(),
        "transaction rejected before execution"
    );
    if resp.code == SEQUENCE_MISMATCH_CODE && resp.codespace == "sdk" {
        return Err(TransportError::SequenceMismatch { raw_log: resp.raw_log }.into());
    }
    Err(TransportError::Rejected {
        code: resp.code,
        codespace: resp.codespace,
        raw_log: resp.raw_log,
    }
    .into())
}

/// Poll until `txhash` is included and classify the outcome.
///
/// Transport errors while polling are logged and retried until attempts run
/// out, because the transaction may already be in a block.
pub async fn confirm(chain: &dyn ChainRpc, txhash: &str, config: &ConfirmConfig) -> Result<BroadcastResult> {
    for attempt in 0..config.max_attempts {
        match chain.tx_by_hash(txhash).await {
            Ok(Some(resp)) => {
                let result = BroadcastResult::classify(resp);
                info!(txhash, success = result.is_success(), "transaction included");
                return Ok(result);
            }
            Ok(None) => debug!(txhash, attempt, "transaction not yet included"),
            Err(e) => warn!(txhash, attempt, error = %e, "confirmation poll failed"),
        }
        if attempt + 1 < config.max_attempts {
            tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
        }
    }
    Err(TransportError::NotConfirmed {
        txhash: txhash.to_string(),
        attempts: config.max_attempts,
    }
    .into())
}

/// Submit then confirm. The envelope is consumed.
pub async fn broadcast(chain: &dyn ChainRpc, tx: SignedTx, config: &ConfirmConfig) -> Result<BroadcastResult> {
    let txhash = submit(chain, &tx).await?;
    drop(tx);
    confirm(chain, &txhash, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryChain;
    use crate::{AccountInfo, StdFee, TxDraft};
    use nftmx_crypto::SigningIdentity;
    use nftmx_msg::{build, Operation};
    use nftmx_types::{MarketError, Coin};

    const KEY: &str = "c6a0d9fa6e2d8a1f1d2c7c3b7a9f1e2b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f";
    const MARKET: &str = "terra1d0n6e9k666xurqej0j0tl0znkwzrnqr8sayx37";

    fn fast() -> ConfirmConfig {
        ConfirmConfig { poll_interval_ms: 1, max_attempts: 3 }
    }

    fn signed(id: &SigningIdentity, sequence: u64) -> SignedTx {
        let op = build(Operation::SetPaused { paused: false }, 0).unwrap();
        TxDraft::from_operations(vec![op], id.address(), MARKET)
            .unwrap()
            .assemble(
                "localterra",
                AccountInfo { account_number: 0, sequence },
                StdFee { amount: vec![Coin::new("uluna", "3000")], gas: 200_000 },
            )
            .sign(id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_success() {
        let id = SigningIdentity::from_private_key_hex(KEY).unwrap();
        let chain = MemoryChain::new();
        let result = broadcast(&chain, signed(&id, 0), &fast()).await.unwrap();
        assert!(result.is_success());
        let success = result.into_result().unwrap();
        assert_eq!(success.attribute("wasm", "action"), Some("set_paused"));
        assert_eq!(chain.account(id.address()).await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_stale_sequence_is_mismatch() {
        let id = SigningIdentity::from_private_key_hex(KEY).unwrap();
        let chain = MemoryChain::new();
        let first = signed(&id, 0);
        let second = signed(&id, 0);
        submit(&chain, &first).await.unwrap();
        match submit(&chain, &second).await {
            Err(MarketError::Transport(TransportError::SequenceMismatch { raw_log })) => {
                assert!(raw_log.contains("expected 1, got 0"));
            }
            other => panic!("expected sequence mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execution_failure_is_not_transport() {
        let id = SigningIdentity::from_private_key_hex(KEY).unwrap();
        let chain = MemoryChain::new().fail_action("set_paused", 5, "wasm", "Unauthorized");
        let result = broadcast(&chain, signed(&id, 0), &fast()).await.unwrap();
        match result {
            BroadcastResult::Failure(f) => {
                assert_eq!(f.code, 5);
                assert_eq!(f.codespace, "wasm");
                assert_eq!(f.raw_log, "Unauthorized");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        // sequence is consumed even when execution fails
        assert_eq!(chain.account(id.address()).await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_not_confirmed_keeps_hash() {
        let id = SigningIdentity::from_private_key_hex(KEY).unwrap();
        let chain = MemoryChain::new().with_pending_polls(10);
        let txhash = submit(&chain, &signed(&id, 0)).await.unwrap();
        match confirm(&chain, &txhash, &fast()).await {
            Err(MarketError::Transport(TransportError::NotConfirmed { txhash: pending, attempts })) => {
                assert_eq!(pending, txhash);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected not confirmed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_after_pending_polls() {
        let id = SigningIdentity::from_private_key_hex(KEY).unwrap();
        let chain = MemoryChain::new().with_pending_polls(2);
        let result = broadcast(&chain, signed(&id, 0), &fast()).await.unwrap();
        assert!(result.is_success());
    }
}
