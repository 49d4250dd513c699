//! Gas price schedules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price per unit of gas, keyed by denomination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GasPrices(BTreeMap<String, Decimal>);

impl GasPrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// The static schedule used when no pricing endpoint answers: 0.015 uluna.
    pub fn static_default() -> Self {
        Self::new().with("uluna", Decimal::new(15, 3))
    }

    pub fn with(mut self, denom: impl Into<String>, price: Decimal) -> Self {
        self.0.insert(denom.into(), price);
        self
    }

    pub fn get(&self, denom: &str) -> Option<Decimal> {
        self.0.get(denom).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(denom, price)| (denom.as_str(), *price))
    }
}

impl FromIterator<(String, Decimal)> for GasPrices {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
