//! Fee computation.
//!
//! Flow: simulated (or supplied) gas -> gas limit = ceil(gas * adjustment)
//! -> fee amount = ceil(gas limit * gas price) in the fee denom.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use nftmx_types::{Coin, GasPrices, MarketError, Result};
use tracing::debug;

use crate::{ChainRpc, StdFee, UnsignedTx};

/// How gas limits and fees are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeConfig {
    /// Skip simulation and start from this gas figure.
    pub gas_limit: Option<u64>,
    pub gas_adjustment: Decimal,
    pub gas_prices: GasPrices,
    pub fee_denom: String,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_limit: None,
            gas_adjustment: Decimal::new(14, 1),
            gas_prices: GasPrices::static_default(),
            fee_denom: "uluna".to_string(),
        }
    }
}

impl FeeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.gas_adjustment <= Decimal::ONE {
            return Err(MarketError::Config(format!(
                "gas adjustment must be greater than 1, got {}",
                self.gas_adjustment
            )));
        }
        if self.fee_denom.is_empty() {
            return Err(MarketError::Config("fee denom must not be empty".to_string()));
        }
        Ok(())
    }

    /// `ceil(estimate * gas_adjustment)`.
    pub fn scale_gas(&self, estimate: u64) -> Result<u64> {
        let scaled = (Decimal::from(estimate) * self.gas_adjustment).ceil();
        scaled
            .to_u64()
            .ok_or_else(|| MarketError::FeeEstimation(format!("gas limit {} out of range", scaled)))
    }

    /// Fee for a gas limit in the configured denom.
    pub fn fee_for_gas(&self, gas_limit: u64) -> Result<StdFee> {
        let price = self.gas_prices.get(&self.fee_denom).ok_or_else(|| {
            MarketError::FeeEstimation(format!("no gas price for denom {}", self.fee_denom))
        })?;
        let amount = (Decimal::from(gas_limit) * price).ceil();
        let amount = amount
            .to_u128()
            .ok_or_else(|| MarketError::FeeEstimation(format!("fee amount {} out of range", amount)))?;
        Ok(StdFee {
            amount: vec![Coin::new(self.fee_denom.clone(), amount.to_string())],
            gas: gas_limit,
        })
    }
}

/// Estimate the fee for `tx`.
///
/// Without an explicit gas figure the chain simulates the transaction; any
/// simulation failure surfaces as `FeeEstimation` and nothing is signed.
pub async fn estimate_fee(chain: &dyn ChainRpc, tx: &UnsignedTx, config: &FeeConfig) -> Result<StdFee> {
    let estimate = match config.gas_limit {
        Some(gas) => gas,
        None => chain
            .simulate(tx)
            .await
            .map_err(|e| MarketError::FeeEstimation(format!("simulation failed: {}", e)))?,
    };
    if estimate == 0 {
        return Err(MarketError::FeeEstimation("gas estimate is zero".to_string()));
    }
    let gas_limit = config.scale_gas(estimate)?;
    let fee = config.fee_for_gas(gas_limit)?;
    debug!(estimate, gas_limit, fee = ?fee.amount, "fee estimated");
    Ok(fee)
}
