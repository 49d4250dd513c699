//! HTTP client for the FCD gas price endpoint.
//!
//! Endpoints:
//! - GET /v1/txs/gas_prices

use nftmx_types::{GasPrices, MarketError, Result, TransportError};
use std::time::Duration;

/// Gas price client.
pub struct GasPriceClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GasPriceClient {
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(5_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Fetch the current schedule, e.g. `{"uluna": "0.01133", "uusd": "0.15"}`.
    ///
    /// GET /v1/txs/gas_prices
    pub async fn fetch(&self) -> Result<GasPrices> {
        let url = format!("{}/v1/txs/gas_prices", self.base_url);

        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body }.into());
        }

        let prices: GasPrices = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e)
            } else {
                TransportError::InvalidResponse(format!("failed to parse gas prices: {}", e)).into()
            }
        })?;
        if prices.is_empty() {
            return Err(TransportError::InvalidResponse("empty gas price schedule".to_string()).into());
        }
        Ok(prices)
    }
}

fn transport_error(e: reqwest::Error) -> MarketError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string()).into()
    } else {
        TransportError::Unreachable(e.to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/txs/gas_prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uluna": "0.01133",
                "uusd": "0.15"
            })))
            .mount(&mock_server)
            .await;

        let client = GasPriceClient::new(&mock_server.uri(), None);
        let prices = client.fetch().await.unwrap();
        assert_eq!(prices.get("uluna"), Some(Decimal::from_str("0.01133").unwrap()));
        assert_eq!(prices.get("uusd"), Some(Decimal::from_str("0.15").unwrap()));
    }

    #[tokio::test]
    async fn test_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/txs/gas_prices"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = GasPriceClient::new(&mock_server.uri(), None);
        assert!(matches!(
            client.fetch().await,
            Err(MarketError::Transport(TransportError::Status { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_schedule() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/txs/gas_prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let client = GasPriceClient::new(&mock_server.uri(), None);
        assert!(matches!(
            client.fetch().await,
            Err(MarketError::Transport(TransportError::InvalidResponse(_)))
        ));
    }
}
