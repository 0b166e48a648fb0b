//! On-chain read/write abstraction.
//!
//! Wraps an alloy provider with three distinct call surfaces:
//! - idempotent reads with bounded retry and exponential backoff
//! - operator-signed writes, serialized per signer and never auto-retried
//! - pure unsigned-transaction builders for user-signed flows
//!
//! All monetary amounts cross this boundary as base-10^18 fixed-point
//! integers; human-decimal views are derived for display only.

pub mod contracts;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ContractsConfig, RpcConfig};
use crate::wallet::OperatorWallet;
use crate::{Error, Result};

use contracts::{IAaveStrategy, IERC20, ILeverageStrategy, IStrategyRouter, IYieldVault};

/// Read retry policy: 3 attempts, exponential backoff from a 500ms base.
const READ_ATTEMPTS: u32 = 3;
const READ_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// A fully encoded but unsigned call, returned for an external party
/// to sign and submit. Never executed by the sentinel itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub to: String,
    /// 0x-prefixed hex calldata
    pub data: String,
    /// Decimal-string wei value
    pub value: String,
}

/// Receipt of an operator-signed write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
    pub status: bool,
    pub block_number: Option<u64>,
}

/// Vault-level snapshot. Created fresh on every read, never mutated.
#[derive(Debug, Clone)]
pub struct VaultState {
    pub total_assets: U256,
    pub total_supply: U256,
    pub total_managed_assets: U256,
}

/// Per-strategy snapshot, recreated per read.
#[derive(Debug, Clone)]
pub struct StrategyState {
    pub strategy_id: String,
    pub deposited: U256,
    pub borrowed: U256,
    pub pool_balance: U256,
}

/// A user's vault position.
#[derive(Debug, Clone)]
pub struct UserBalances {
    pub shares: U256,
    pub withdrawable: U256,
}

/// Stateless client for the vault system contracts.
pub struct ChainClient {
    provider: DynProvider,
    vault: Address,
    leverage_strategy: Address,
    aave_strategy: Address,
    router: Address,
    yield_pool: Address,
    asset_token: Address,
    chain_id: u64,
    operator: Option<Address>,
    /// Serializes signed submissions so concurrent jobs cannot race the
    /// operator nonce.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ChainClient {
    /// Connect a read-only client (no operator key; write methods fail).
    pub fn connect(contracts: &ContractsConfig, rpc: &RpcConfig) -> Result<Self> {
        let url = Self::rpc_url(contracts.chain_id, rpc)?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Self::build(contracts, provider, None)
    }

    /// Connect with the operator wallet attached for protocol-maintenance
    /// writes.
    pub fn connect_with_operator(
        contracts: &ContractsConfig,
        rpc: &RpcConfig,
        wallet: &OperatorWallet,
    ) -> Result<Self> {
        let url = Self::rpc_url(contracts.chain_id, rpc)?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(url)
            .erased();
        Self::build(contracts, provider, Some(wallet.address()))
    }

    fn rpc_url(chain_id: u64, rpc: &RpcConfig) -> Result<url::Url> {
        let raw = rpc
            .get(chain_id)
            .ok_or_else(|| Error::Config(format!("No RPC URL configured for chain {}", chain_id)))?;
        raw.parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL '{}': {}", raw, e)))
    }

    fn build(
        contracts: &ContractsConfig,
        provider: DynProvider,
        operator: Option<Address>,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            vault: Self::parse_address(&contracts.vault)?,
            leverage_strategy: Self::parse_address(&contracts.leverage_strategy)?,
            aave_strategy: Self::parse_address(&contracts.aave_strategy)?,
            router: Self::parse_address(&contracts.router)?,
            yield_pool: Self::parse_address(&contracts.yield_pool)?,
            asset_token: Self::parse_address(&contracts.asset_token)?,
            chain_id: contracts.chain_id,
            operator,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Parse a hex address string into an alloy Address.
    pub fn parse_address(addr: &str) -> Result<Address> {
        addr.parse::<Address>()
            .map_err(|e| Error::InvalidArgument(format!("Invalid address '{}': {}", addr, e)))
    }

    /// Parse a decimal-string fixed-point amount into a U256.
    pub fn parse_amount(amount: &str) -> Result<U256> {
        U256::from_str_radix(amount, 10)
            .map_err(|e| Error::InvalidArgument(format!("Invalid amount '{}': {}", amount, e)))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn operator(&self) -> Option<Address> {
        self.operator
    }

    // -----------------------------------------------------------------
    // Reads (idempotent, retried)
    // -----------------------------------------------------------------

    /// Run a read with bounded retries. Reads are side-effect-free, so
    /// re-issuing on transient RPC failure is safe.
    async fn retry_read<T, Fut>(
        &self,
        method: &'static str,
        mut call: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, alloy::contract::Error>>,
    {
        let mut last_error = String::new();
        for attempt in 0..READ_ATTEMPTS {
            if attempt > 0 {
                let backoff = READ_BACKOFF_BASE * 2u32.pow(attempt - 1);
                debug!(method, attempt, backoff_ms = backoff.as_millis() as u64, "retrying read");
                tokio::time::sleep(backoff).await;
            }
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(method, attempt, error = %e, "chain read failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(Error::ChainRead {
            attempts: READ_ATTEMPTS,
            message: format!("{}: {}", method, last_error),
        })
    }

    /// Read the vault's global state. The three reads fan out concurrently.
    pub async fn vault_state(&self) -> Result<VaultState> {
        let vault = IYieldVault::new(self.vault, self.provider.clone());
        let (total_assets, total_supply, total_managed_assets) = tokio::try_join!(
            self.retry_read("totalAssets", || {
                let v = vault.clone();
                async move { v.totalAssets().call().await }
            }),
            self.retry_read("totalSupply", || {
                let v = vault.clone();
                async move { v.totalSupply().call().await }
            }),
            self.retry_read("totalManagedAssets", || {
                let v = vault.clone();
                async move { v.totalManagedAssets().call().await }
            }),
        )?;
        Ok(VaultState {
            total_assets,
            total_supply,
            total_managed_assets,
        })
    }

    /// Read detailed state for all strategies.
    pub async fn strategy_states(&self) -> Result<Vec<StrategyState>> {
        let leverage = ILeverageStrategy::new(self.leverage_strategy, self.provider.clone());
        let aave = IAaveStrategy::new(self.aave_strategy, self.provider.clone());
        let (deposited, borrowed, pool_balance) = tokio::try_join!(
            self.retry_read("deposited", || {
                let s = leverage.clone();
                async move { s.deposited().call().await }
            }),
            self.retry_read("borrowedWETH", || {
                let s = leverage.clone();
                async move { s.borrowedWETH().call().await }
            }),
            self.retry_read("strategyBalance", || {
                let s = aave.clone();
                async move { s.strategyBalance().call().await }
            }),
        )?;
        Ok(vec![
            StrategyState {
                strategy_id: "leverage".to_string(),
                deposited,
                borrowed,
                pool_balance: U256::ZERO,
            },
            StrategyState {
                strategy_id: "aave".to_string(),
                deposited: U256::ZERO,
                borrowed: U256::ZERO,
                pool_balance,
            },
        ])
    }

    /// Read the leverage strategy's collateral and debt.
    pub async fn leverage_position(&self) -> Result<(U256, U256)> {
        let leverage = ILeverageStrategy::new(self.leverage_strategy, self.provider.clone());
        tokio::try_join!(
            self.retry_read("deposited", || {
                let s = leverage.clone();
                async move { s.deposited().call().await }
            }),
            self.retry_read("borrowedWETH", || {
                let s = leverage.clone();
                async move { s.borrowedWETH().call().await }
            }),
        )
    }

    /// Whether the leverage strategy is currently paused.
    pub async fn leverage_paused(&self) -> Result<bool> {
        let leverage = ILeverageStrategy::new(self.leverage_strategy, self.provider.clone());
        self.retry_read("paused", || {
            let s = leverage.clone();
            async move { s.paused().call().await }
        })
        .await
    }

    /// Read a user's share balance and the assets it converts to.
    pub async fn user_balances(&self, user: Address) -> Result<UserBalances> {
        let vault = IYieldVault::new(self.vault, self.provider.clone());
        let shares = self
            .retry_read("balanceOf", || {
                let v = vault.clone();
                async move { v.balanceOf(user).call().await }
            })
            .await?;
        let withdrawable = self
            .retry_read("convertToAssets", || {
                let v = vault.clone();
                async move { v.convertToAssets(shares).call().await }
            })
            .await?;
        Ok(UserBalances {
            shares,
            withdrawable,
        })
    }

    /// Convert an asset amount to vault shares at the current exchange rate.
    pub async fn convert_to_shares(&self, assets: U256) -> Result<U256> {
        let vault = IYieldVault::new(self.vault, self.provider.clone());
        self.retry_read("convertToShares", || {
            let v = vault.clone();
            async move { v.convertToShares(assets).call().await }
        })
        .await
    }

    /// Convert vault shares to the asset amount they redeem for.
    pub async fn convert_to_assets(&self, shares: U256) -> Result<U256> {
        let vault = IYieldVault::new(self.vault, self.provider.clone());
        self.retry_read("convertToAssets", || {
            let v = vault.clone();
            async move { v.convertToAssets(shares).call().await }
        })
        .await
    }

    /// Read the vault's spending allowance granted by `owner` on the
    /// underlying asset token.
    pub async fn vault_allowance(&self, owner: Address) -> Result<U256> {
        let token = IERC20::new(self.asset_token, self.provider.clone());
        let vault = self.vault;
        self.retry_read("allowance", || {
            let t = token.clone();
            async move { t.allowance(owner, vault).call().await }
        })
        .await
    }

    // -----------------------------------------------------------------
    // Writes (operator-signed, serialized, never auto-retried)
    // -----------------------------------------------------------------

    /// Submit a signed transaction and wait for one confirmation.
    ///
    /// Writes are not retried: resubmitting a state-changing call risks
    /// double execution. The lock holds until the receipt lands so a
    /// second write cannot race the operator nonce.
    async fn submit_write<Fut>(
        &self,
        method: &'static str,
        send: impl FnOnce() -> Fut,
    ) -> Result<TxReceipt>
    where
        Fut: Future<
            Output = std::result::Result<alloy::rpc::types::TransactionReceipt, String>,
        >,
    {
        if self.operator.is_none() {
            return Err(Error::ChainWrite(format!(
                "{}: no operator wallet configured",
                method
            )));
        }

        let _guard = self.write_lock.lock().await;
        debug!(method, "submitting operator transaction");

        let receipt = send()
            .await
            .map_err(|reason| Error::ChainWrite(format!("{}: {}", method, reason)))?;

        let tx = TxReceipt {
            hash: format!("{}", receipt.transaction_hash),
            status: receipt.status(),
            block_number: receipt.block_number,
        };
        if !tx.status {
            return Err(Error::ChainWrite(format!(
                "{} reverted in tx {}",
                method, tx.hash
            )));
        }
        Ok(tx)
    }

    /// Trigger the vault's rebalance through the strategy router.
    pub async fn rebalance(&self) -> Result<TxReceipt> {
        let router = IStrategyRouter::new(self.router, self.provider.clone());
        self.submit_write("rebalance", || async move {
            router
                .rebalance()
                .send()
                .await
                .map_err(|e| e.to_string())?
                .get_receipt()
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    /// Call harvest() on a strategy.
    pub async fn harvest(&self, strategy: Address) -> Result<TxReceipt> {
        let target = IAaveStrategy::new(strategy, self.provider.clone());
        self.submit_write("harvest", || async move {
            target
                .harvest()
                .send()
                .await
                .map_err(|e| e.to_string())?
                .get_receipt()
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    /// Unwind leverage through the router to reduce liquidation risk.
    pub async fn trigger_deleverage(&self, steps: u64) -> Result<TxReceipt> {
        let router = IStrategyRouter::new(self.router, self.provider.clone());
        let strategy = self.leverage_strategy;
        self.submit_write("triggerDeleverage", || async move {
            router
                .triggerDeleverage(strategy, U256::from(steps))
                .send()
                .await
                .map_err(|e| e.to_string())?
                .get_receipt()
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    /// Accrue interest in the yield pool for the vault's asset.
    pub async fn accrue_yield(&self) -> Result<TxReceipt> {
        let pool = contracts::IYieldPool::new(self.yield_pool, self.provider.clone());
        let asset = self.asset_token;
        self.submit_write("accrue", || async move {
            pool.accrue(asset)
                .send()
                .await
                .map_err(|e| e.to_string())?
                .get_receipt()
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    /// Pause or unpause the leverage strategy.
    pub async fn set_leverage_paused(&self, state: bool) -> Result<TxReceipt> {
        let leverage = ILeverageStrategy::new(self.leverage_strategy, self.provider.clone());
        self.submit_write("setPaused", || async move {
            leverage
                .setPaused(state)
                .send()
                .await
                .map_err(|e| e.to_string())?
                .get_receipt()
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    // -----------------------------------------------------------------
    // Unsigned builders (pure encoding; user-signed flows)
    // -----------------------------------------------------------------

    fn unsigned(to: Address, data: Vec<u8>) -> UnsignedTransaction {
        UnsignedTransaction {
            to: format!("{}", to),
            data: format!("0x{}", alloy::hex::encode(data)),
            value: "0".to_string(),
        }
    }

    /// Encode an approve call so the vault can spend the user's asset
    /// tokens: `approve(address spender, uint256 amount)`.
    pub fn build_approve_transaction(&self, amount: U256) -> UnsignedTransaction {
        let call = IERC20::approveCall {
            spender: self.vault,
            amount,
        };
        Self::unsigned(self.asset_token, call.abi_encode())
    }

    /// Encode a vault deposit: `deposit(uint256 assets)`.
    pub fn build_deposit_transaction(&self, assets: U256) -> UnsignedTransaction {
        let call = IYieldVault::depositCall { assets };
        Self::unsigned(self.vault, call.abi_encode())
    }

    /// Encode a vault withdrawal: `withdraw(uint256 shares)`.
    pub fn build_withdraw_transaction(&self, shares: U256) -> UnsignedTransaction {
        let call = IYieldVault::withdrawCall { shares };
        Self::unsigned(self.vault, call.abi_encode())
    }
}

/// Format a base-10^18 fixed-point value as a human decimal string.
pub fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Parse a human decimal string into a base-10^18 fixed-point value.
pub fn parse_units(amount: &str) -> Result<U256> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "Invalid amount '{}'",
            amount
        )));
    }
    if frac.len() > 18 {
        return Err(Error::InvalidArgument(format!(
            "Amount '{}' has more than 18 decimal places",
            amount
        )));
    }
    let whole_part = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10)
            .map_err(|e| Error::InvalidArgument(format!("Invalid amount '{}': {}", amount, e)))?
    };
    let frac_padded = format!("{:0<18}", frac);
    let frac_part = if frac.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_padded, 10)
            .map_err(|e| Error::InvalidArgument(format!("Invalid amount '{}': {}", amount, e)))?
    };
    Ok(whole_part * U256::from(10).pow(U256::from(18u64)) + frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractsConfig;
    use std::collections::HashMap;

    fn test_contracts() -> ContractsConfig {
        ContractsConfig {
            vault: "0x0000000000000000000000000000000000000001".to_string(),
            leverage_strategy: "0x0000000000000000000000000000000000000002".to_string(),
            aave_strategy: "0x0000000000000000000000000000000000000003".to_string(),
            router: "0x0000000000000000000000000000000000000004".to_string(),
            yield_pool: "0x0000000000000000000000000000000000000005".to_string(),
            asset_token: "0x0000000000000000000000000000000000000006".to_string(),
            chain_id: 31337,
        }
    }

    fn test_client() -> ChainClient {
        let mut urls = HashMap::new();
        urls.insert(31337, "http://localhost:8545".to_string());
        ChainClient::connect(&test_contracts(), &RpcConfig::with_urls(urls)).unwrap()
    }

    #[test]
    fn test_build_deposit_is_deterministic() {
        let client = test_client();
        let a = client.build_deposit_transaction(U256::from(1_000_000u64));
        let b = client.build_deposit_transaction(U256::from(1_000_000u64));
        assert_eq!(a, b);
        assert!(a.data.starts_with("0x"));
        assert_eq!(a.value, "0");
        assert_eq!(
            a.to.to_lowercase(),
            "0x0000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_approve_targets_asset_token() {
        let client = test_client();
        let tx = client.build_approve_transaction(U256::from(42u64));
        assert_eq!(
            tx.to.to_lowercase(),
            "0x0000000000000000000000000000000000000006"
        );
        // selector + two 32-byte words
        assert_eq!(tx.data.len(), 2 + 2 * (4 + 64));
    }

    #[test]
    fn test_distinct_calls_encode_differently() {
        let client = test_client();
        let deposit = client.build_deposit_transaction(U256::from(1u64));
        let withdraw = client.build_withdraw_transaction(U256::from(1u64));
        assert_ne!(deposit.data, withdraw.data);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut contracts = test_contracts();
        contracts.vault = "not-an-address".to_string();
        let mut urls = HashMap::new();
        urls.insert(31337, "http://localhost:8545".to_string());
        let result = ChainClient::connect(&contracts, &RpcConfig::with_urls(urls));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(ChainClient::parse_amount("123").is_ok());
        assert!(ChainClient::parse_amount("not-a-number").is_err());
    }

    #[test]
    fn test_format_units() {
        let one = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(format_units(one, 18), "1");

        let one_point_five = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units(one_point_five, 18), "1.5");

        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_parse_units_round_trips() {
        let v = parse_units("1.5").unwrap();
        assert_eq!(v, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(format_units(v, 18), "1.5");

        assert_eq!(parse_units("0").unwrap(), U256::ZERO);
        assert!(parse_units("1.0000000000000000001").is_err());
        assert!(parse_units("abc").is_err());
    }
}
