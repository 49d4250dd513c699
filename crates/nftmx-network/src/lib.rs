//! Network configuration resolution.
//!
//! Given a network id and optional overrides, produce the endpoint URL, chain
//! id and gas price schedule every other component is constructed with.
//!
//! Gas prices are fetched from the network's FCD at startup. When the fetch
//! fails the static default schedule is used instead, so a pricing outage
//! never blocks marketplace operations.

pub mod gas_price_client;

use serde::{Deserialize, Serialize};
use nftmx_types::{GasPrices, MarketError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

pub use gas_price_client::GasPriceClient;

/// Networks with built-in endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkId {
    /// Testnet.
    Bombay12,
    /// Mainnet.
    Columbus5,
    LocalTerra,
    Custom(String),
}

struct KnownNetwork {
    chain_id: &'static str,
    lcd_url: &'static str,
    fcd_url: &'static str,
}

impl NetworkId {
    pub fn as_str(&self) -> &str {
        match self {
            NetworkId::Bombay12 => "bombay-12",
            NetworkId::Columbus5 => "columbus-5",
            NetworkId::LocalTerra => "localterra",
            NetworkId::Custom(name) => name,
        }
    }

    fn known(&self) -> Option<KnownNetwork> {
        match self {
            NetworkId::Bombay12 => Some(KnownNetwork {
                chain_id: "bombay-12",
                lcd_url: "https://bombay-lcd.terra.dev",
                fcd_url: "https://bombay-fcd.terra.dev",
            }),
            NetworkId::Columbus5 => Some(KnownNetwork {
                chain_id: "columbus-5",
                lcd_url: "https://lcd.terra.dev",
                fcd_url: "https://fcd.terra.dev",
            }),
            NetworkId::LocalTerra => Some(KnownNetwork {
                chain_id: "localterra",
                lcd_url: "http://localhost:1317",
                fcd_url: "http://localhost:3060",
            }),
            NetworkId::Custom(_) => None,
        }
    }
}

impl FromStr for NetworkId {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(MarketError::Config("network id must not be empty".to_string())),
            "bombay-12" | "testnet" => Ok(NetworkId::Bombay12),
            "columbus-5" | "mainnet" => Ok(NetworkId::Columbus5),
            "localterra" => Ok(NetworkId::LocalTerra),
            other => Ok(NetworkId::Custom(other.to_string())),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network section of the operator configuration. Every field overrides the
/// built-in value for the selected network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub network: String,
    pub lcd_url: Option<String>,
    pub chain_id: Option<String>,
    pub fcd_url: Option<String>,
    /// Fixed schedule; skips the FCD fetch when set.
    pub gas_prices: Option<GasPrices>,
    pub request_timeout_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            network: "bombay-12".to_string(),
            lcd_url: None,
            chain_id: None,
            fcd_url: None,
            gas_prices: None,
            request_timeout_ms: 30_000,
        }
    }
}

/// Resolved network parameters, passed explicitly to every consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub network: NetworkId,
    pub lcd_url: String,
    pub chain_id: String,
    pub fcd_url: Option<String>,
    pub gas_prices: GasPrices,
    pub request_timeout_ms: u64,
}

impl NetworkConfig {
    /// Endpoints only, with the configured or static default gas prices.
    pub fn from_settings(settings: &NetworkSettings) -> Result<Self> {
        let network: NetworkId = settings.network.parse()?;
        let known = network.known();

        let lcd_url = settings
            .lcd_url
            .clone()
            .or_else(|| known.as_ref().map(|k| k.lcd_url.to_string()))
            .ok_or_else(|| MarketError::Config(format!("network {} requires lcd_url", network)))?;
        let chain_id = settings
            .chain_id
            .clone()
            .or_else(|| known.as_ref().map(|k| k.chain_id.to_string()))
            .ok_or_else(|| MarketError::Config(format!("network {} requires chain_id", network)))?;
        let fcd_url = settings
            .fcd_url
            .clone()
            .or_else(|| known.as_ref().map(|k| k.fcd_url.to_string()));

        if lcd_url.trim().is_empty() || chain_id.trim().is_empty() {
            return Err(MarketError::Config("lcd_url and chain_id must not be empty".to_string()));
        }

        Ok(Self {
            network,
            lcd_url,
            chain_id,
            fcd_url,
            gas_prices: settings.gas_prices.clone().unwrap_or_else(GasPrices::static_default),
            request_timeout_ms: settings.request_timeout_ms,
        })
    }
}

/// Resolve endpoints and fetch the gas price schedule.
///
/// Only configuration errors fail; a pricing endpoint failure falls back to
/// [`GasPrices::static_default`].
pub async fn resolve(settings: &NetworkSettings) -> Result<NetworkConfig> {
    let mut config = NetworkConfig::from_settings(settings)?;
    if settings.gas_prices.is_none() {
        if let Some(fcd_url) = &config.fcd_url {
            let client = GasPriceClient::new(fcd_url, Some(settings.request_timeout_ms));
            config.gas_prices = fetch_or_default(&client).await;
        }
    }
    info!(
        network = %config.network,
        chain_id = %config.chain_id,
        lcd_url = %config.lcd_url,
        gas_denoms = ?config.gas_prices.denoms().collect::<Vec<_>>(),
        "network resolved"
    );
    Ok(config)
}

/// The fetched schedule, or the static default on any failure.
pub async fn fetch_or_default(client: &GasPriceClient) -> GasPrices {
    match client.fetch().await {
        Ok(prices) => prices,
        Err(e) => {
            warn!(error = %e, "gas price fetch failed, using static default");
            GasPrices::static_default()
        }
    }
}
