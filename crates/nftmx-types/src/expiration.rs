//! cw0 `Expiration` in its wire form.
//!
//! - `Never` -> `{"never": {}}`
//! - `AtTime(secs)` -> `{"at_time": "<nanoseconds>"}` (cw0 `Timestamp` is a nanosecond `Uint64` string)
//! - `AtHeight(h)` -> `{"at_height": h}`

use serde::{Deserialize, Serialize};

use crate::{MarketError, Result};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// When an order or bid stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "ExpirationRepr", try_from = "ExpirationRepr")]
pub enum Expiration {
    Never,
    /// Absolute Unix timestamp in seconds.
    AtTime(u64),
    /// Absolute block height.
    AtHeight(u64),
}

impl Expiration {
    /// Check the expiration is usable for a message built at `now` (Unix seconds).
    pub fn validate(&self, now: u64) -> Result<()> {
        self.validate_lifetime(now, 0)
    }

    /// Like [`validate`](Self::validate), but a time-based expiration must also
    /// lie more than `min_secs` after `now`.
    pub fn validate_lifetime(&self, now: u64, min_secs: u64) -> Result<()> {
        match *self {
            Expiration::Never => Ok(()),
            Expiration::AtTime(secs) => {
                if self.is_expired_at(now.saturating_add(min_secs)) {
                    return Err(MarketError::invalid(format!(
                        "expiration {} must be more than {} seconds after current time {}",
                        secs, min_secs, now
                    )));
                }
                if secs.checked_mul(NANOS_PER_SEC).is_none() {
                    return Err(MarketError::invalid(format!(
                        "expiration {} overflows a nanosecond timestamp",
                        secs
                    )));
                }
                Ok(())
            }
            Expiration::AtHeight(height) => {
                if height == 0 {
                    return Err(MarketError::invalid("expiration height must be positive"));
                }
                Ok(())
            }
        }
    }

    /// Whether a time-based expiration has passed. Heights are never judged locally.
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(*self, Expiration::AtTime(secs) if secs <= now)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ExpirationRepr {
    AtHeight(u64),
    AtTime(String),
    Never {},
}

impl From<Expiration> for ExpirationRepr {
    fn from(e: Expiration) -> Self {
        match e {
            Expiration::Never => ExpirationRepr::Never {},
            Expiration::AtTime(secs) => {
                ExpirationRepr::AtTime((secs as u128 * NANOS_PER_SEC as u128).to_string())
            }
            Expiration::AtHeight(h) => ExpirationRepr::AtHeight(h),
        }
    }
}

impl TryFrom<ExpirationRepr> for Expiration {
    type Error = String;

    fn try_from(repr: ExpirationRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ExpirationRepr::Never {} => Ok(Expiration::Never),
            ExpirationRepr::AtHeight(h) => Ok(Expiration::AtHeight(h)),
            ExpirationRepr::AtTime(nanos) => {
                let nanos: u64 = nanos
                    .parse()
                    .map_err(|e| format!("invalid at_time {:?}: {}", nanos, e))?;
                Ok(Expiration::AtTime(nanos / NANOS_PER_SEC))
            }
        }
    }
}
