//! Operator wallet
//!
//! SECURITY: This is the ONLY place where the operator's private key exists.
//! - The key is held in alloy's PrivateKeySigner which handles crypto securely
//! - The key is never serialized and never logged
//! - Env material passes through `secrecy::SecretString` so stray clones are
//!   zeroized on drop

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

/// Signing wallet for protocol-maintenance writes.
///
/// The private key is:
/// - Stored in alloy's PrivateKeySigner (handles crypto securely)
/// - Never serialized (no Serialize impl)
/// - Only accessible via signing operations
pub struct OperatorWallet {
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy integration
    wallet: EthereumWallet,
}

impl OperatorWallet {
    /// Create a wallet from an environment variable holding a hex key.
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key: SecretString = std::env::var(var_name)
            .map_err(|_| {
                Error::Wallet(format!(
                    "Environment variable {} not set. Required for operator writes.",
                    var_name
                ))
            })?
            .into();

        Self::from_hex(key.expose_secret())
    }

    /// Create a wallet from a hex-encoded private key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        Ok(Self { address, wallet })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the address as a checksummed string
    pub fn address_string(&self) -> String {
        format!("{:?}", self.address)
    }

    /// Get a reference to the EthereumWallet for use with alloy providers.
    ///
    /// This is safe because EthereumWallet only exposes signing operations,
    /// not the raw private key.
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for OperatorWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
