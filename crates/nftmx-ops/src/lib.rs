//! Marketplace orchestration: build, assemble, sign, submit, confirm.
//!
//! One transaction moves through
//! `Built -> Assembled -> Signed -> Submitted -> {ConfirmedSuccess | ConfirmedExecutionFailure | TransportFailed}`.
//!
//! Sign-and-submit for one identity is serialized behind an async mutex that
//! also owns the cached account sequence. Confirmation polling runs outside
//! the lock so independent transactions can be in flight together.

pub mod report;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use nftmx_crypto::{validate_address, SigningIdentity};
use nftmx_msg::{build_now, cw721, Bid, BuiltOperation, ContractCall, Operation, Order, QueryMsg};
use nftmx_network::NetworkConfig;
use nftmx_tx::{
    broadcast, estimate_fee, AccountInfo, BroadcastResult, ChainRpc, ConfirmConfig, FeeConfig,
    LcdClient, StdFee, TxDraft,
};
use nftmx_types::{AssetRef, Coin, Expiration, MarketError, Price, Result};

pub use report::{Report, ReportStatus};

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Built,
    Assembled,
    Signed,
    Submitted,
    ConfirmedSuccess,
    ConfirmedExecutionFailure,
    TransportFailed,
}

/// Lifecycle event for progress reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum TxEvent {
    Built { operations: Vec<String> },
    Assembled { sequence: u64, gas: u64, fee: Vec<Coin> },
    Signed { sequence: u64 },
    Submitted { txhash: String, sequence: u64 },
    ConfirmedSuccess { txhash: String, height: u64 },
    ConfirmedExecutionFailure { txhash: String, code: u32, codespace: String },
    TransportFailed { txhash: Option<String>, message: String },
}

impl TxEvent {
    pub fn state(&self) -> TxState {
        match self {
            TxEvent::Built { .. } => TxState::Built,
            TxEvent::Assembled { .. } => TxState::Assembled,
            TxEvent::Signed { .. } => TxState::Signed,
            TxEvent::Submitted { .. } => TxState::Submitted,
            TxEvent::ConfirmedSuccess { .. } => TxState::ConfirmedSuccess,
            TxEvent::ConfirmedExecutionFailure { .. } => TxState::ConfirmedExecutionFailure,
            TxEvent::TransportFailed { .. } => TxState::TransportFailed,
        }
    }
}

/// Callback type for transaction events.
pub type TxEventHandler = Box<dyn Fn(TxEvent) + Send + Sync>;

/// Client for one signing identity against one marketplace contract.
pub struct MarketClient {
    chain: Arc<dyn ChainRpc>,
    chain_id: String,
    marketplace: String,
    identity: Arc<SigningIdentity>,
    fee: FeeConfig,
    confirm: ConfirmConfig,
    account: Mutex<Option<AccountInfo>>,
    on_event: Option<TxEventHandler>,
}

impl MarketClient {
    pub fn new(
        chain: Arc<dyn ChainRpc>,
        chain_id: impl Into<String>,
        marketplace: &str,
        identity: Arc<SigningIdentity>,
    ) -> Result<Self> {
        validate_address(marketplace)
            .map_err(|e| MarketError::Config(format!("marketplace address: {}", e)))?;
        Ok(Self {
            chain,
            chain_id: chain_id.into(),
            marketplace: marketplace.to_string(),
            identity,
            fee: FeeConfig::default(),
            confirm: ConfirmConfig::default(),
            account: Mutex::new(None),
            on_event: None,
        })
    }

    /// Connect to the network's LCD endpoint, pricing fees with its gas schedule.
    pub fn connect(network: &NetworkConfig, marketplace: &str, identity: Arc<SigningIdentity>) -> Result<Self> {
        let lcd = LcdClient::new(&network.lcd_url, Some(network.request_timeout_ms))
            .with_gas_prices(network.gas_prices.clone());
        let mut client = Self::new(Arc::new(lcd), network.chain_id.clone(), marketplace, identity)?;
        client.fee.gas_prices = network.gas_prices.clone();
        Ok(client)
    }

    pub fn with_fee_config(mut self, fee: FeeConfig) -> Result<Self> {
        fee.validate()?;
        self.fee = fee;
        Ok(self)
    }

    pub fn with_confirm_config(mut self, confirm: ConfirmConfig) -> Result<Self> {
        if confirm.max_attempts == 0 {
            return Err(MarketError::Config("max_attempts must be at least 1".to_string()));
        }
        self.confirm = confirm;
        Ok(self)
    }

    pub fn with_event_handler(mut self, handler: TxEventHandler) -> Self {
        self.on_event = Some(handler);
        self
    }

    pub fn address(&self) -> &str {
        self.identity.address()
    }

    pub fn marketplace(&self) -> &str {
        &self.marketplace
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn emit(&self, event: TxEvent) {
        debug!(state = ?event.state(), "transaction event");
        if let Some(ref handler) = self.on_event {
            handler(event);
        }
    }

    /// Validate, sign and submit one operation, then wait for its result.
    ///
    /// Invalid parameters fail before any network call.
    pub async fn execute(&self, operation: Operation) -> Result<BroadcastResult> {
        let built = build_now(operation)?;
        self.execute_built(vec![built]).await
    }

    /// Several already-built operations in one transaction, in order.
    pub async fn execute_built(&self, operations: Vec<BuiltOperation>) -> Result<BroadcastResult> {
        let calls = operations
            .into_iter()
            .map(|op| op.into_call(&self.marketplace))
            .collect::<Result<Vec<_>>>()?;
        self.execute_calls(calls).await
    }

    /// Arbitrary contract calls in one transaction.
    pub async fn execute_calls(&self, calls: Vec<ContractCall>) -> Result<BroadcastResult> {
        let operations = calls.iter().map(call_name).collect();
        self.emit(TxEvent::Built { operations });
        let txhash = self.submit_calls(calls).await?;
        self.confirm(&txhash).await
    }

    /// List the NFT and hand it to the marketplace, in one transaction.
    ///
    /// Messages run in order and `create_order` checks that the sender still
    /// owns the token, so the listing goes first and the transfer second.
    pub async fn create_order_with_transfer(
        &self,
        asset: AssetRef,
        price: Price,
        expire_at: Expiration,
    ) -> Result<BroadcastResult> {
        let transfer = cw721::transfer_nft(&asset, &self.marketplace)?;
        let order = build_now(Operation::CreateOrder { asset, price, expire_at })?
            .into_call(&self.marketplace)?;
        self.execute_calls(vec![order, transfer]).await
    }

    /// The serialized critical section. Returns the accepted transaction hash.
    ///
    /// The cached sequence advances only on acceptance and is dropped on any
    /// failure, so the next call re-reads it from the chain.
    pub async fn submit_calls(&self, calls: Vec<ContractCall>) -> Result<String> {
        let draft = TxDraft::from_calls(calls, self.identity.address())?;
        let mut cached = self.account.lock().await;
        match self.sign_and_submit(draft, &mut cached).await {
            Ok(txhash) => Ok(txhash),
            Err(e) => {
                *cached = None;
                if let MarketError::Transport(_) = e {
                    self.emit(TxEvent::TransportFailed { txhash: None, message: e.to_string() });
                }
                warn!(kind = e.kind(), error = %e, "sign and submit failed");
                Err(e)
            }
        }
    }

    async fn sign_and_submit(&self, draft: TxDraft, cached: &mut Option<AccountInfo>) -> Result<String> {
        let account = match *cached {
            Some(account) => account,
            None => self.chain.account(self.identity.address()).await?,
        };

        let unsigned = draft.assemble(&self.chain_id, account, StdFee::default());
        let fee = estimate_fee(self.chain.as_ref(), &unsigned, &self.fee).await?;
        self.emit(TxEvent::Assembled {
            sequence: account.sequence,
            gas: fee.gas,
            fee: fee.amount.clone(),
        });
        let unsigned = unsigned.with_fee(fee);

        let signed = unsigned.sign(&self.identity)?;
        self.emit(TxEvent::Signed { sequence: account.sequence });

        let txhash = broadcast::submit(self.chain.as_ref(), &signed).await?;
        *cached = Some(AccountInfo {
            account_number: account.account_number,
            sequence: account.sequence + 1,
        });
        self.emit(TxEvent::Submitted { txhash: txhash.clone(), sequence: account.sequence });
        Ok(txhash)
    }

    /// Wait for an accepted transaction and classify it.
    pub async fn confirm(&self, txhash: &str) -> Result<BroadcastResult> {
        match broadcast::confirm(self.chain.as_ref(), txhash, &self.confirm).await {
            Ok(result) => {
                match &result {
                    BroadcastResult::Success(s) => {
                        info!(txhash = %s.txhash, height = s.height, "transaction succeeded");
                        self.emit(TxEvent::ConfirmedSuccess { txhash: s.txhash.clone(), height: s.height });
                    }
                    BroadcastResult::Failure(f) => {
                        warn!(txhash = %f.txhash, code = f.code, codespace = %f.codespace, "transaction failed");
                        self.emit(TxEvent::ConfirmedExecutionFailure {
                            txhash: f.txhash.clone(),
                            code: f.code,
                            codespace: f.codespace.clone(),
                        });
                    }
                }
                Ok(result)
            }
            Err(e) => {
                self.emit(TxEvent::TransportFailed {
                    txhash: Some(txhash.to_string()),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// The listing for `asset`, if the contract holds one.
    pub async fn query_order(&self, asset: &AssetRef) -> Result<Order> {
        self.query(&QueryMsg::valid_order(asset)).await
    }

    /// The bid on `asset`, if any.
    pub async fn query_bid(&self, asset: &AssetRef) -> Result<Bid> {
        self.query(&QueryMsg::valid_bid(asset)).await
    }

    /// Contract version string.
    pub async fn version(&self) -> Result<String> {
        self.query(&QueryMsg::Version {}).await
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, msg: &QueryMsg) -> Result<T> {
        let msg = serde_json::to_value(msg)
            .map_err(|e| MarketError::Other(format!("failed to serialize query: {}", e)))?;
        let value = self.chain.query_contract(&self.marketplace, &msg).await?;
        serde_json::from_value(value).map_err(|e| {
            nftmx_types::TransportError::InvalidResponse(format!("unexpected query response: {}", e)).into()
        })
    }
}

/// The execute message's top-level key, e.g. `create_order`.
fn call_name(call: &ContractCall) -> String {
    call.msg
        .as_object()
        .and_then(|obj| obj.keys().next())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftmx_tx::MemoryChain;
    use nftmx_types::TransportError;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    const KEY: &str = "c6a0d9fa6e2d8a1f1d2c7c3b7a9f1e2b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f";
    const MARKET: &str = "terra1d0n6e9k666xurqej0j0tl0znkwzrnqr8sayx37";
    const NFT: &str = "terra1rmw87h769rt553myzcvnqavvnqzqxm2r9twsju";

    fn identity() -> Arc<SigningIdentity> {
        Arc::new(SigningIdentity::from_private_key_hex(KEY).unwrap())
    }

    fn client(chain: Arc<MemoryChain>) -> MarketClient {
        MarketClient::new(chain, "localterra", MARKET, identity())
            .unwrap()
            .with_confirm_config(ConfirmConfig { poll_interval_ms: 1, max_attempts: 3 })
            .unwrap()
    }

    fn create_order(token_id: &str) -> Operation {
        Operation::CreateOrder {
            asset: AssetRef::new(NFT, token_id),
            price: Price::native("10000", "uluna"),
            expire_at: Expiration::AtTime(nftmx_types::now_unix_secs() + 604_800),
        }
    }

    #[tokio::test]
    async fn test_execute_success() {
        let chain = Arc::new(MemoryChain::new());
        let client = client(chain.clone());
        let result = client.execute(create_order("2")).await.unwrap();
        let success = result.into_result().unwrap();
        assert_eq!(success.attribute("wasm", "action"), Some("create_order"));

        let executed = chain.executed().unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].contract, MARKET);
        assert_eq!(executed[0].execute_msg["create_order"]["token_id"], json!("2"));
    }

    #[tokio::test]
    async fn test_lifecycle_events_in_order() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let chain = Arc::new(MemoryChain::new());
        let client = client(chain).with_event_handler(Box::new(move |event: TxEvent| {
            sink.lock().unwrap().push(event.state());
        }));
        client.execute(Operation::SetPaused { paused: true }).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                TxState::Built,
                TxState::Assembled,
                TxState::Signed,
                TxState::Submitted,
                TxState::ConfirmedSuccess
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_executes_use_distinct_sequences() {
        let chain = Arc::new(MemoryChain::new());
        let client = Arc::new(client(chain.clone()));
        let (a, b) = tokio::join!(
            {
                let client = client.clone();
                async move { client.execute(create_order("1")).await }
            },
            {
                let client = client.clone();
                async move { client.execute(create_order("2")).await }
            }
        );
        assert!(a.unwrap().is_success());
        assert!(b.unwrap().is_success());
        assert_eq!(chain.account(client.address()).await.unwrap().sequence, 2);
        assert_eq!(chain.executed().unwrap().len(), 2);
        assert_eq!(chain.broadcast_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_spawned_executes_share_one_identity() {
        let chain = Arc::new(MemoryChain::new());
        let client = Arc::new(client(chain.clone()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move { client.execute(create_order(&i.to_string())).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_success());
        }
        assert_eq!(chain.account(client.address()).await.unwrap().sequence, 4);
    }

    #[tokio::test]
    async fn test_stale_sequence_recovers_on_next_call() {
        let chain = Arc::new(MemoryChain::new());
        let client = client(chain.clone());
        client.execute(Operation::SetPaused { paused: true }).await.unwrap();

        // another process signs with the same key and takes sequence 1
        let op = nftmx_msg::build_now(Operation::SetPaused { paused: false }).unwrap();
        let external = TxDraft::from_operations(vec![op], client.address(), MARKET)
            .unwrap()
            .assemble("localterra", AccountInfo { account_number: 0, sequence: 1 }, StdFee::default())
            .sign(&identity())
            .unwrap();
        broadcast::submit(chain.as_ref(), &external).await.unwrap();

        match client.execute(Operation::SetPaused { paused: true }).await {
            Err(MarketError::Transport(TransportError::SequenceMismatch { .. })) => {}
            other => panic!("expected sequence mismatch, got {:?}", other),
        }
        assert!(client.execute(Operation::SetPaused { paused: true }).await.unwrap().is_success());
        assert_eq!(chain.account(client.address()).await.unwrap().sequence, 3);
    }

    #[tokio::test]
    async fn test_execution_failure_surfaces_code() {
        let chain = Arc::new(MemoryChain::new().fail_action("create_order", 5, "wasm", "Marketplace: paused"));
        let client = client(chain.clone());
        match client.execute(create_order("2")).await.unwrap() {
            BroadcastResult::Failure(f) => {
                assert_eq!(f.code, 5);
                assert_eq!(f.codespace, "wasm");
            }
            other => panic!("expected execution failure, got {:?}", other),
        }
        // the failed transaction still consumed a sequence number
        assert!(client.execute(Operation::SetPaused { paused: false }).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_reach_chain() {
        let chain = Arc::new(MemoryChain::new());
        let client = client(chain.clone());
        let err = client
            .execute(Operation::CreateOrder {
                asset: AssetRef::new(NFT, "2"),
                price: Price::native("-5", "uluna"),
                expire_at: Expiration::Never,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_operation_parameters");

        let err = client
            .execute(Operation::CreateOrder {
                asset: AssetRef::new(NFT, "2"),
                price: Price::native("10000", "uluna"),
                expire_at: Expiration::AtTime(nftmx_types::now_unix_secs() - 1),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_operation_parameters");
        assert_eq!(chain.broadcast_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_simulation_unavailable() {
        let chain = Arc::new(MemoryChain::new().with_simulated_gas(None));
        let client = client(chain.clone());
        let err = client.execute(Operation::SetPaused { paused: true }).await.unwrap_err();
        assert_eq!(err.kind(), "fee_estimation");
        assert_eq!(chain.broadcast_count().unwrap(), 0);

        let client = client_with_gas(chain.clone(), 120_000);
        assert!(client.execute(Operation::SetPaused { paused: true }).await.unwrap().is_success());
    }

    fn client_with_gas(chain: Arc<MemoryChain>, gas: u64) -> MarketClient {
        client(chain)
            .with_fee_config(FeeConfig { gas_limit: Some(gas), ..FeeConfig::default() })
            .unwrap()
    }

    #[tokio::test]
    async fn test_not_confirmed() {
        let states = Arc::new(StdMutex::new(Vec::new()));
        let sink = states.clone();
        let chain = Arc::new(MemoryChain::new().with_pending_polls(10));
        let client = client(chain).with_event_handler(Box::new(move |event: TxEvent| {
            sink.lock().unwrap().push(event.state());
        }));
        match client.execute(Operation::SetPaused { paused: true }).await {
            Err(MarketError::Transport(TransportError::NotConfirmed { txhash, .. })) => {
                assert_eq!(txhash.len(), 64);
            }
            other => panic!("expected not confirmed, got {:?}", other),
        }
        assert_eq!(states.lock().unwrap().last(), Some(&TxState::TransportFailed));
    }

    #[tokio::test]
    async fn test_transfer_and_list_in_one_envelope() {
        let chain = Arc::new(MemoryChain::new());
        let client = client(chain.clone());
        let result = client
            .create_order_with_transfer(AssetRef::new(NFT, "7"), Price::native("500", "uluna"), Expiration::Never)
            .await
            .unwrap();
        assert!(result.is_success());
        let executed = chain.executed().unwrap();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].contract, MARKET);
        assert_eq!(executed[0].execute_msg["create_order"]["token_id"], json!("7"));
        assert_eq!(executed[1].contract, NFT);
        assert_eq!(executed[1].execute_msg["transfer_nft"]["recipient"], json!(MARKET));
        assert_eq!(chain.broadcast_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bid_attaches_funds() {
        let chain = Arc::new(MemoryChain::new());
        let client = client(chain.clone());
        client
            .execute(Operation::CreateBid {
                asset: AssetRef::new(NFT, "2"),
                price: Price::native("10000", "uluna"),
                expire_at: Expiration::Never,
            })
            .await
            .unwrap();
        let executed = chain.executed().unwrap();
        assert_eq!(executed[0].coins, vec![Coin::new("uluna", "10000")]);
    }

    #[tokio::test]
    async fn test_queries() {
        let asset = AssetRef::new(NFT, "2");
        let order = json!({
            "token_id": "2",
            "nft_address": NFT,
            "seller": "terra1vfas6tt3tsdnzqy42g7u0my68gln4ep9n34w5u",
            "price": {"info": {"native_token": {"denom": "uluna"}}, "amount": "10000"},
            "expire_at": {"never": {}}
        });
        let chain = Arc::new(
            MemoryChain::new()
                .with_query_response(MARKET, json!({"version": {}}), json!("1.72"))
                .with_query_response(
                    MARKET,
                    json!({"valid_order": {"token_id": "2", "nft_address": NFT}}),
                    order,
                ),
        );
        let client = client(chain);
        assert_eq!(client.version().await.unwrap(), "1.72");
        let order = client.query_order(&asset).await.unwrap();
        assert_eq!(order.price.amount, "10000");
        assert_eq!(order.expire_at, Expiration::Never);
        assert!(client.query_bid(&asset).await.is_err());
    }

    #[test]
    fn test_rejects_bad_marketplace() {
        let chain = Arc::new(MemoryChain::new());
        let err = MarketClient::new(chain, "localterra", "cosmos1xyz", identity()).err().unwrap();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_call_name() {
        let call = ContractCall { contract: MARKET.to_string(), msg: json!({"cancel_bid": {}}), funds: vec![] };
        assert_eq!(call_name(&call), "cancel_bid");
    }
}
