//! HTTP client for the chain's LCD (REST) endpoint.
//!
//! Endpoints:
//! - GET /cosmos/auth/v1beta1/accounts/{address}
//! - POST /txs/estimate_fee
//! - POST /txs (mode "sync")
//! - GET /txs/{hash}
//! - GET /wasm/contracts/{address}/store?query_msg=<json>

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use nftmx_types::{Coin, GasPrices, MarketError, Result, TransportError};
use std::time::Duration;
use tracing::debug;

use crate::{string_u64, AccountInfo, ChainRpc, SignedTx, StdTx, SubmitResponse, TxResponse, UnsignedTx};

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    tx: &'a StdTx,
    mode: &'static str,
}

#[derive(Serialize)]
struct EstimateFeeRequest<'a> {
    tx: &'a StdTx,
    gas_prices: Vec<Coin>,
    gas_adjustment: &'static str,
}

#[derive(Deserialize)]
struct EstimatedFee {
    #[serde(with = "string_u64")]
    gas: u64,
}

/// `result` is either the fee itself or `{"fee": ...}` depending on the LCD version.
#[derive(Deserialize)]
#[serde(untagged)]
enum EstimateResult {
    Wrapped { fee: EstimatedFee },
    Bare(EstimatedFee),
}

#[derive(Deserialize)]
struct ResultWrapper<T> {
    result: T,
}

#[derive(Deserialize)]
struct AccountWrapper {
    account: Value,
}

/// LCD client implementing [`ChainRpc`].
pub struct LcdClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    gas_prices: GasPrices,
}

impl LcdClient {
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(30_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
            gas_prices: GasPrices::static_default(),
        }
    }

    /// Prices sent along with simulation requests.
    pub fn with_gas_prices(mut self, gas_prices: GasPrices) -> Self {
        self.gas_prices = gas_prices;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        read_body(resp).await
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<String> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        read_body(resp)
            .await?
            .ok_or_else(|| TransportError::Status { status: 404, body: String::new() }.into())
    }
}

/// `Ok(None)` on 404; other non-2xx statuses are errors.
async fn read_body(resp: reqwest::Response) -> Result<Option<String>> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let body = resp.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(TransportError::Status { status: status.as_u16(), body }.into());
    }
    Ok(Some(body))
}

fn transport_error(e: reqwest::Error) -> MarketError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string()).into()
    } else {
        TransportError::Unreachable(e.to_string()).into()
    }
}

fn parse<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| TransportError::InvalidResponse(format!("failed to parse {}: {}", what, e)).into())
}

/// Account number and sequence from a plain or vesting account.
fn parse_account(account: &Value) -> Result<AccountInfo> {
    let base = account
        .get("base_vesting_account")
        .and_then(|v| v.get("base_account"))
        .or_else(|| account.get("base_account"))
        .unwrap_or(account);
    serde_json::from_value(base.clone())
        .map_err(|e| TransportError::InvalidResponse(format!("failed to parse account: {}", e)).into())
}

#[async_trait]
impl ChainRpc for LcdClient {
    async fn account(&self, address: &str) -> Result<AccountInfo> {
        let url = format!("{}/cosmos/auth/v1beta1/accounts/{}", self.base_url, address);
        let body = self
            .get(&url, &[])
            .await?
            .ok_or_else(|| MarketError::Other(format!("account {} not found on chain", address)))?;
        let wrapper: AccountWrapper = parse(&body, "account")?;
        let info = parse_account(&wrapper.account)?;
        debug!(address, account_number = info.account_number, sequence = info.sequence, "fetched account");
        Ok(info)
    }

    async fn simulate(&self, tx: &UnsignedTx) -> Result<u64> {
        let url = format!("{}/txs/estimate_fee", self.base_url);
        let gas_prices = self
            .gas_prices
            .iter()
            .map(|(denom, price)| Coin::new(denom, price.to_string()))
            .collect();
        let std_tx = tx.to_std_tx();
        let request = EstimateFeeRequest {
            tx: &std_tx,
            gas_prices,
            gas_adjustment: "1",
        };
        let body = self.post(&url, &request).await?;
        let wrapper: ResultWrapper<EstimateResult> = parse(&body, "fee estimate")?;
        let gas = match wrapper.result {
            EstimateResult::Wrapped { fee } | EstimateResult::Bare(fee) => fee.gas,
        };
        Ok(gas)
    }

    async fn broadcast(&self, tx: &SignedTx) -> Result<SubmitResponse> {
        let url = format!("{}/txs", self.base_url);
        let body = self
            .post(&url, &BroadcastRequest { tx: tx.tx(), mode: "sync" })
            .await?;
        parse(&body, "broadcast response")
    }

    async fn tx_by_hash(&self, txhash: &str) -> Result<Option<TxResponse>> {
        let url = format!("{}/txs/{}", self.base_url, txhash);
        match self.get(&url, &[]).await? {
            Some(body) => Ok(Some(parse(&body, "transaction")?)),
            None => Ok(None),
        }
    }

    async fn query_contract(&self, contract: &str, msg: &Value) -> Result<Value> {
        let url = format!("{}/wasm/contracts/{}/store", self.base_url, contract);
        let body = self
            .get(&url, &[("query_msg", msg.to_string())])
            .await?
            .ok_or_else(|| MarketError::Other(format!("contract {} not found", contract)))?;
        let wrapper: ResultWrapper<Value> = parse(&body, "contract query")?;
        Ok(wrapper.result)
    }
}
