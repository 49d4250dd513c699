//! Operator configuration loading and validation.
//!
//! Settings come from a TOML file (`nftmx.toml` by default). Key material is
//! read only from the environment, never from the file:
//! - `WALLET_SEEDS`: BIP-39 mnemonic
//! - `NFTMX_PRIVATE_KEY`: hex-encoded 32-byte private key
//!
//! # Example
//!
//! ```toml
//! [network]
//! network = "bombay-12"
//!
//! [marketplace]
//! address = "terra1..."
//!
//! [fee]
//! gas_adjustment = "1.4"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use nftmx_crypto::{KeyMaterial, SigningIdentity, DEFAULT_HD_PATH};
use nftmx_network::{NetworkConfig, NetworkSettings};
use nftmx_tx::{ConfirmConfig, FeeConfig};

use crate::logging::LoggingConfig;

pub const MNEMONIC_ENV: &str = "WALLET_SEEDS";
pub const PRIVATE_KEY_ENV: &str = "NFTMX_PRIVATE_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplaceConfig {
    /// Marketplace contract address.
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeeSettings {
    /// Skip simulation and scale this gas figure instead.
    pub gas_limit: Option<u64>,
    pub gas_adjustment: Decimal,
    pub fee_denom: String,
}

impl Default for FeeSettings {
    fn default() -> Self {
        let defaults = FeeConfig::default();
        Self {
            gas_limit: defaults.gas_limit,
            gas_adjustment: defaults.gas_adjustment,
            fee_denom: defaults.fee_denom,
        }
    }
}

impl FeeSettings {
    /// Fee configuration priced with the resolved network's gas schedule.
    pub fn to_fee_config(&self, network: &NetworkConfig) -> FeeConfig {
        FeeConfig {
            gas_limit: self.gas_limit,
            gas_adjustment: self.gas_adjustment,
            gas_prices: network.gas_prices.clone(),
            fee_denom: self.fee_denom.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmSettings {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ConfirmSettings {
    fn default() -> Self {
        let defaults = ConfirmConfig::default();
        Self {
            poll_interval_ms: defaults.poll_interval_ms,
            max_attempts: defaults.max_attempts,
        }
    }
}

impl From<&ConfirmSettings> for ConfirmConfig {
    fn from(settings: &ConfirmSettings) -> Self {
        ConfirmConfig {
            poll_interval_ms: settings.poll_interval_ms,
            max_attempts: settings.max_attempts,
        }
    }
}

/// Wallet configuration. Key material is loaded from the environment at runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// BIP-32 path for mnemonic derivation; defaults to `m/44'/330'/0'/0/0`.
    #[serde(default)]
    pub hd_path: Option<String>,
    #[serde(skip)]
    pub key_material: Option<KeyMaterial>,
}

impl WalletConfig {
    pub fn identity(&self) -> Result<SigningIdentity> {
        let material = self.key_material.as_ref().ok_or(ConfigError::MissingField { field: MNEMONIC_ENV })?;
        let identity = match material {
            KeyMaterial::Mnemonic(phrase) => {
                SigningIdentity::from_mnemonic_with_path(phrase, self.hd_path.as_deref().unwrap_or(DEFAULT_HD_PATH))
            }
            KeyMaterial::PrivateKeyHex(_) => SigningIdentity::from_key_material(material),
        };
        identity.map_err(|e| ConfigError::InvalidValue { field: "wallet", reason: e.to_string() })
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub fee: FeeSettings,

    #[serde(default)]
    pub confirm: ConfirmSettings,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content, taking key material from the
    /// process environment.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_with_env(content, |name| std::env::var(name).ok())
    }

    pub fn parse_with_env<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content)?;

        // Key material only from the environment (never from the config file)
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        config.wallet.key_material = non_empty(MNEMONIC_ENV)
            .map(KeyMaterial::Mnemonic)
            .or_else(|| non_empty(PRIVATE_KEY_ENV).map(KeyMaterial::PrivateKeyHex));

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.marketplace.address.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "marketplace.address" });
        }
        if self.fee.gas_adjustment <= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "fee.gas_adjustment",
                reason: "must be greater than 1".to_string(),
            });
        }
        if self.confirm.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "confirm.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.confirm.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "confirm.max_attempts",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("expected pretty or json, got {}", self.logging.format),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const MARKET: &str = "terra1d0n6e9k666xurqej0j0tl0znkwzrnqr8sayx37";
    const TEST_KEY: &str = "c6a0d9fa6e2d8a1f1d2c7c3b7a9f1e2b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f";
    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn minimal() -> String {
        format!("[marketplace]\naddress = \"{}\"\n", MARKET)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse_with_env(&minimal(), no_env).unwrap();
        assert_eq!(config.network.network, "bombay-12");
        assert_eq!(config.fee.gas_adjustment, Decimal::from_str("1.4").unwrap());
        assert_eq!(config.confirm.poll_interval_ms, 1000);
        assert_eq!(config.confirm.max_attempts, 30);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.wallet.key_material.is_none());
        assert!(matches!(
            config.wallet.identity(),
            Err(ConfigError::MissingField { field: MNEMONIC_ENV })
        ));
    }

    #[test]
    fn test_full_file() {
        let content = format!(
            r#"
[network]
network = "localterra"
lcd_url = "http://127.0.0.1:1317"
request_timeout_ms = 5000

[network.gas_prices]
uluna = "0.02"

[marketplace]
address = "{}"

[fee]
gas_adjustment = "1.5"
gas_limit = 300000

[confirm]
poll_interval_ms = 500
max_attempts = 10

[logging]
level = "debug"
format = "json"
"#,
            MARKET
        );
        let config = Config::parse_with_env(&content, no_env).unwrap();
        assert_eq!(config.network.lcd_url.as_deref(), Some("http://127.0.0.1:1317"));
        assert_eq!(config.network.request_timeout_ms, 5000);
        assert_eq!(
            config.network.gas_prices.as_ref().and_then(|p| p.get("uluna")),
            Some(Decimal::from_str("0.02").unwrap())
        );
        assert_eq!(config.fee.gas_limit, Some(300_000));
        assert_eq!(ConfirmConfig::from(&config.confirm).max_attempts, 10);
        assert_eq!(config.logging.level, "debug");

        let network = NetworkConfig::from_settings(&config.network).unwrap();
        let fee = config.fee.to_fee_config(&network);
        assert_eq!(fee.gas_prices.get("uluna"), Some(Decimal::from_str("0.02").unwrap()));
        assert!(fee.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::parse_with_env("", no_env),
            Err(ConfigError::MissingField { field: "marketplace.address" })
        ));

        let content = format!("{}\n[fee]\ngas_adjustment = \"1.0\"\n", minimal());
        assert!(matches!(
            Config::parse_with_env(&content, no_env),
            Err(ConfigError::InvalidValue { field: "fee.gas_adjustment", .. })
        ));

        let content = format!("{}\n[confirm]\npoll_interval_ms = 0\n", minimal());
        assert!(matches!(
            Config::parse_with_env(&content, no_env),
            Err(ConfigError::InvalidValue { field: "confirm.poll_interval_ms", .. })
        ));

        let content = format!("{}\n[logging]\nformat = \"xml\"\n", minimal());
        assert!(Config::parse_with_env(&content, no_env).is_err());

        assert!(matches!(Config::parse_with_env("[[[", no_env), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_key_material_from_env_only() {
        let env = |name: &str| match name {
            PRIVATE_KEY_ENV => Some(TEST_KEY.to_string()),
            _ => None,
        };
        let config = Config::parse_with_env(&minimal(), env).unwrap();
        let identity = config.wallet.identity().unwrap();
        assert_eq!(identity.address(), "terra1khx3u8zp9t9vvvg9wk3elzzs8uk72tq9hq8h2u");

        // the mnemonic wins when both are set
        let env = |name: &str| match name {
            MNEMONIC_ENV => Some(TEST_MNEMONIC.to_string()),
            PRIVATE_KEY_ENV => Some(TEST_KEY.to_string()),
            _ => None,
        };
        let config = Config::parse_with_env(&minimal(), env).unwrap();
        assert_eq!(
            config.wallet.identity().unwrap().address(),
            "terra1amdttz2937a3dytmxmkany53pp6ma6dy4vsllv"
        );
        assert!(!format!("{:?}", config).contains("abandon"));
    }

    #[test]
    fn test_bad_key_is_not_echoed() {
        let env = |name: &str| match name {
            PRIVATE_KEY_ENV => Some("deadbeef".to_string()),
            _ => None,
        };
        let config = Config::parse_with_env(&minimal(), env).unwrap();
        let err = config.wallet.identity().unwrap_err();
        assert!(!err.to_string().contains("deadbeef"));
    }
}
