//! Market price feed
//!
//! Read-only HTTP client over a simple-price JSON endpoint
//! (`{ asset_id: { usd, usd_24h_change? } }`). A zero or missing `usd`
//! value is treated as feed failure, never as a valid price.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One quoted asset.
#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub asset_id: String,
    pub usd: f64,
    /// 24h move in percent, when the feed provides it
    pub usd_24h_change: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AssetPrice {
    #[serde(default)]
    usd: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

/// Client for the simple-price endpoint.
#[derive(Debug, Clone)]
pub struct PriceFeedClient {
    base_url: String,
    client: reqwest::Client,
}

impl PriceFeedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch USD prices for the given asset ids.
    ///
    /// Every requested asset must come back with a positive price;
    /// anything else aborts the caller's step rather than flowing a
    /// degenerate value into a report or a decision.
    pub async fn get_prices(&self, asset_ids: &[String]) -> Result<Vec<PriceQuote>> {
        if asset_ids.is_empty() {
            return Err(Error::PriceFeed("no assets requested".to_string()));
        }

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url,
            asset_ids.join(",")
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::PriceFeed(format!("request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::PriceFeed(format!(
                "price endpoint returned {}",
                response.status()
            )));
        }

        let body: HashMap<String, AssetPrice> = response
            .json()
            .await
            .map_err(|e| Error::PriceFeed(format!("malformed price response: {}", e)))?;

        let fetched_at = Utc::now();
        let mut quotes = Vec::with_capacity(asset_ids.len());
        for asset_id in asset_ids {
            let entry = body.get(asset_id).ok_or_else(|| {
                Error::PriceFeed(format!("no quote returned for '{}'", asset_id))
            })?;
            let usd = entry.usd.unwrap_or(0.0);
            if usd <= 0.0 {
                return Err(Error::PriceFeed(format!(
                    "feed returned zero/invalid price for '{}'",
                    asset_id
                )));
            }
            quotes.push(PriceQuote {
                asset_id: asset_id.clone(),
                usd,
                usd_24h_change: entry.usd_24h_change,
                fetched_at,
            });
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn assets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_prices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 14.52, "usd_24h_change": -2.3 },
                "weth": { "usd": 3100.0 }
            })))
            .mount(&mock_server)
            .await;

        let client = PriceFeedClient::new(mock_server.uri());
        let quotes = client
            .get_prices(&assets(&["chainlink", "weth"]))
            .await
            .unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].asset_id, "chainlink");
        assert!((quotes[0].usd - 14.52).abs() < 1e-9);
        assert_eq!(quotes[0].usd_24h_change, Some(-2.3));
        assert_eq!(quotes[1].usd_24h_change, None);
    }

    #[tokio::test]
    async fn test_zero_price_is_feed_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 0 }
            })))
            .mount(&mock_server)
            .await;

        let client = PriceFeedClient::new(mock_server.uri());
        let result = client.get_prices(&assets(&["chainlink"])).await;

        assert!(matches!(result, Err(Error::PriceFeed(_))));
    }

    #[tokio::test]
    async fn test_missing_asset_is_feed_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let client = PriceFeedClient::new(mock_server.uri());
        let result = client.get_prices(&assets(&["chainlink"])).await;

        assert!(matches!(result, Err(Error::PriceFeed(_))));
    }

    #[tokio::test]
    async fn test_http_error_is_feed_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = PriceFeedClient::new(mock_server.uri());
        let result = client.get_prices(&assets(&["chainlink"])).await;

        assert!(matches!(result, Err(Error::PriceFeed(_))));
    }
}
