//! Market price tool

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::price::PriceFeedClient;
use crate::tools::Tool;
use crate::Result;

/// Fetches real-time asset prices from the configured feed.
pub struct TokenPricesTool {
    feed: PriceFeedClient,
    assets: Vec<String>,
}

impl TokenPricesTool {
    pub fn new(feed: PriceFeedClient, assets: Vec<String>) -> Self {
        Self { feed, assets }
    }
}

#[async_trait]
impl Tool for TokenPricesTool {
    fn name(&self) -> &'static str {
        super::TOOL_GET_TOKEN_PRICES
    }

    fn description(&self) -> &'static str {
        "Fetches real-time USD prices and 24h changes for the monitored assets."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let quotes = self.feed.get_prices(&self.assets).await?;

        let mut raw = Map::new();
        let mut human = Map::new();
        let mut numeric = Vec::new();
        for quote in &quotes {
            numeric.push(json!({
                "asset_id": quote.asset_id,
                "usd": quote.usd,
                "usd_24h_change": quote.usd_24h_change,
            }));
            // Raw mirrors the fixed-point convention used on-chain.
            let fixed = (quote.usd * 1e18).floor() as u128;
            raw.insert(
                format!("{}_usd", quote.asset_id),
                Value::String(fixed.to_string()),
            );

            let mut entry = Map::new();
            entry.insert("usd".to_string(), json!(format!("{:.2}", quote.usd)));
            if let Some(change) = quote.usd_24h_change {
                entry.insert(
                    "usd_24h_change".to_string(),
                    json!(format!("{:+.2}%", change)),
                );
            }
            human.insert(quote.asset_id.clone(), Value::Object(entry));
        }

        Ok(json!({
            "raw": raw,
            "human": human,
            "quotes": numeric,
            "source": "price feed",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_token_prices_tool_separates_raw_and_human() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 14.5, "usd_24h_change": 1.25 }
            })))
            .mount(&mock_server)
            .await;

        let tool = TokenPricesTool::new(
            PriceFeedClient::new(mock_server.uri()),
            vec!["chainlink".to_string()],
        );
        let out = tool.execute(json!({})).await.unwrap();

        assert_eq!(out["raw"]["chainlink_usd"], "14500000000000000000");
        assert_eq!(out["human"]["chainlink"]["usd"], "14.50");
        assert_eq!(out["human"]["chainlink"]["usd_24h_change"], "+1.25%");
    }

    #[tokio::test]
    async fn test_token_prices_tool_propagates_feed_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 0 }
            })))
            .mount(&mock_server)
            .await;

        let tool = TokenPricesTool::new(
            PriceFeedClient::new(mock_server.uri()),
            vec!["chainlink".to_string()],
        );
        let result = tool.execute(json!({})).await;

        assert!(matches!(result, Err(crate::Error::PriceFeed(_))));
    }
}
