//! RPC endpoint configuration
//!
//! Supports multiple configuration methods following Ethereum ecosystem
//! conventions:
//! 1. `VAULT_RPC_URL` - explicit endpoint for the monitored chain (highest priority)
//! 2. Per-chain env vars (ETH_RPC_URL, ARBITRUM_RPC_URL, ...)
//! 3. ALCHEMY_API_KEY - builds URLs automatically
//! 4. Public RPC fallbacks - for testing only

use std::collections::HashMap;

/// RPC configuration for the chains the sentinel can talk to
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const BASE: u64 = 8453;
    pub const LOCAL: u64 = 31337;
}

/// Environment variable names
mod env_vars {
    /// Endpoint for whatever chain the vault lives on (highest priority)
    pub const VAULT_RPC_URL: &str = "VAULT_RPC_URL";

    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const ARBITRUM_RPC_URL: &str = "ARBITRUM_RPC_URL";
    pub const BASE_RPC_URL: &str = "BASE_RPC_URL";

    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const ARBITRUM: &str = "https://arb1.arbitrum.io/rpc";
    pub const BASE: &str = "https://mainnet.base.org";
    pub const LOCAL: &str = "http://localhost:8545";
}

impl RpcConfig {
    /// Create RPC config from environment variables.
    ///
    /// `vault_chain_id` is the chain the monitored contracts live on;
    /// `VAULT_RPC_URL` (if set) is bound to it regardless of which chain
    /// it is.
    pub fn from_env(vault_chain_id: u64) -> Self {
        let mut urls = HashMap::new();

        // Priority 1: explicit endpoint for the monitored chain
        if let Ok(url) = std::env::var(env_vars::VAULT_RPC_URL) {
            tracing::debug!(chain_id = vault_chain_id, "Using VAULT_RPC_URL");
            urls.insert(vault_chain_id, url);
        }

        // Priority 2: per-chain env vars
        if let Ok(url) = std::env::var(env_vars::ETH_RPC_URL) {
            urls.entry(chains::ETHEREUM).or_insert(url);
        }
        if let Ok(url) = std::env::var(env_vars::ARBITRUM_RPC_URL) {
            urls.entry(chains::ARBITRUM).or_insert(url);
        }
        if let Ok(url) = std::env::var(env_vars::BASE_RPC_URL) {
            urls.entry(chains::BASE).or_insert(url);
        }

        // Priority 3: build from ALCHEMY_API_KEY
        if !urls.contains_key(&vault_chain_id) {
            if let Ok(key) = std::env::var(env_vars::ALCHEMY_API_KEY) {
                tracing::info!("Building RPC URLs from ALCHEMY_API_KEY");
                urls.entry(chains::ETHEREUM)
                    .or_insert_with(|| format!("https://eth-mainnet.g.alchemy.com/v2/{}", key));
                urls.entry(chains::ARBITRUM)
                    .or_insert_with(|| format!("https://arb-mainnet.g.alchemy.com/v2/{}", key));
                urls.entry(chains::BASE)
                    .or_insert_with(|| format!("https://base-mainnet.g.alchemy.com/v2/{}", key));
            }
        }

        // Priority 4: public fallbacks
        if !urls.contains_key(&vault_chain_id) {
            tracing::warn!(
                chain_id = vault_chain_id,
                "No RPC configured for the vault chain, falling back to a public RPC (rate limited)"
            );
        }
        urls.entry(chains::ETHEREUM)
            .or_insert_with(|| public_rpcs::ETHEREUM.to_string());
        urls.entry(chains::ARBITRUM)
            .or_insert_with(|| public_rpcs::ARBITRUM.to_string());
        urls.entry(chains::BASE)
            .or_insert_with(|| public_rpcs::BASE.to_string());
        urls.entry(chains::LOCAL)
            .or_insert_with(|| public_rpcs::LOCAL.to_string());

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_fallbacks_cover_known_chains() {
        std::env::remove_var("VAULT_RPC_URL");
        std::env::remove_var("ETH_RPC_URL");
        std::env::remove_var("ALCHEMY_API_KEY");

        let config = RpcConfig::from_env(chains::LOCAL);

        assert!(config.has_chain(chains::ETHEREUM));
        assert!(config.has_chain(chains::ARBITRUM));
        assert!(config.has_chain(chains::BASE));
        assert_eq!(config.get(chains::LOCAL), Some(public_rpcs::LOCAL));
    }

    #[test]
    fn test_explicit_urls() {
        let mut urls = HashMap::new();
        urls.insert(31337, "http://anvil:8545".to_string());
        let config = RpcConfig::with_urls(urls);

        assert_eq!(config.get(31337), Some("http://anvil:8545"));
        assert_eq!(config.get(1), None);
    }
}
