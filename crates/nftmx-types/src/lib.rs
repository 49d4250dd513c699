//! Shared value objects and the error taxonomy for the NFTMX marketplace client.
//!
//! Every other crate in the workspace returns [`Result`] and speaks in the
//! types defined here: asset references, prices, expirations, coins and gas
//! price schedules.

use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub mod asset;
pub mod expiration;
pub mod gas;

pub use asset::{AssetInfo, AssetRef, Coin, Price};
pub use expiration::Expiration;
pub use gas::GasPrices;

/// Bech32 prefix for account and contract addresses on the target chain.
pub const ACCOUNT_PREFIX: &str = "terra";

/// Network-level failures. The transaction was never executed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("account sequence mismatch: {raw_log}")]
    SequenceMismatch { raw_log: String },

    #[error("rejected before execution (code {code}, codespace {codespace}): {raw_log}")]
    Rejected {
        code: u32,
        codespace: String,
        raw_log: String,
    },

    #[error("invalid response from endpoint: {0}")]
    InvalidResponse(String),

    #[error("transaction {txhash} not confirmed after {attempts} attempts")]
    NotConfirmed { txhash: String, attempts: u32 },
}

impl TransportError {
    /// Whether resubmitting the unchanged signed envelope can succeed.
    ///
    /// Only true when the request may never have reached the chain. The caller
    /// still has to confirm the account sequence has not advanced.
    pub fn may_retry_same_envelope(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Unreachable(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Marketplace client error types.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("invalid operation parameters: {0}")]
    InvalidOperationParameters(String),

    #[error("fee estimation failed: {0}")]
    FeeEstimation(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("contract execution failed (code {code}, codespace {codespace}): {raw_log}")]
    ContractExecution {
        code: u32,
        codespace: String,
        raw_log: String,
        txhash: String,
    },

    #[error("invalid key material")]
    InvalidKeyMaterial,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl MarketError {
    /// Stable discriminator for programmatic branching and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::InvalidOperationParameters(_) => "invalid_operation_parameters",
            MarketError::FeeEstimation(_) => "fee_estimation",
            MarketError::Transport(_) => "transport",
            MarketError::ContractExecution { .. } => "contract_execution",
            MarketError::InvalidKeyMaterial => "invalid_key_material",
            MarketError::Config(_) => "config",
            MarketError::Other(_) => "other",
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        MarketError::InvalidOperationParameters(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;

/// Parse a CosmWasm `Uint128` decimal string.
///
/// Only ASCII digits are accepted: no sign, no whitespace, no exponent.
pub fn parse_uint128(s: &str) -> Result<u128> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MarketError::invalid(format!(
            "amount must be a non-negative integer string, got {:?}",
            s
        )));
    }
    s.parse::<u128>()
        .map_err(|_| MarketError::invalid(format!("amount {} exceeds uint128", s)))
}

/// Current Unix time in whole seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uint128_accepts_large_amounts() {
        let max = u128::MAX.to_string();
        assert_eq!(parse_uint128(&max).unwrap(), u128::MAX);
        assert_eq!(parse_uint128("0").unwrap(), 0);
        assert_eq!(parse_uint128("10000").unwrap(), 10_000);
    }

    #[test]
    fn test_parse_uint128_rejects_malformed() {
        for bad in ["", "-1", "+5", "1.5", "1e6", " 10", "abc", "340282366920938463463374607431768211456"] {
            let err = parse_uint128(bad).unwrap_err();
            assert_eq!(err.kind(), "invalid_operation_parameters", "input {:?}", bad);
        }
    }

    #[test]
    fn test_retry_classification() {
        assert!(TransportError::Timeout("broadcast".into()).may_retry_same_envelope());
        assert!(TransportError::Unreachable("dns".into()).may_retry_same_envelope());
        assert!(TransportError::Status { status: 503, body: String::new() }.may_retry_same_envelope());
        assert!(!TransportError::Status { status: 400, body: String::new() }.may_retry_same_envelope());
        assert!(!TransportError::SequenceMismatch { raw_log: String::new() }.may_retry_same_envelope());
        assert!(!TransportError::NotConfirmed { txhash: "AB".into(), attempts: 3 }.may_retry_same_envelope());
    }

    #[test]
    fn test_error_kinds() {
        let err: MarketError = TransportError::Timeout("x".into()).into();
        assert_eq!(err.kind(), "transport");
        let err = MarketError::ContractExecution {
            code: 5,
            codespace: "wasm".into(),
            raw_log: "paused".into(),
            txhash: "AB".into(),
        };
        assert_eq!(err.kind(), "contract_execution");
        assert!(err.to_string().contains("codespace wasm"));
    }
}
