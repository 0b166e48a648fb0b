//! Vault Sentinel
//!
//! An automated monitoring-and-control loop for a yield-bearing vault:
//! - Reads vault, strategy, and market state on three independent schedules
//! - Classifies leverage risk (LTV bands at 0.70 / 0.80)
//! - Delegates action selection to a pluggable decision strategy backed by
//!   schema-validated tools
//! - Issues corrective operator-signed transactions and builds unsigned
//!   transactions for user-signed flows
//! - Reports every cycle to an operator channel
//!
//! # Safety Model
//!
//! - The operator key never leaves the wallet module
//! - Writes are serialized per signer and never auto-retried
//! - Unsigned transactions are returned to the user's own signer, never
//!   submitted here
//! - A failure in one scheduled job can never disturb the others

pub mod chain;
pub mod config;
pub mod price;
pub mod report;
pub mod risk;
pub mod scheduler;
pub mod service;
pub mod strategy;
pub mod tools;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use chain::{ChainClient, TxReceipt, UnsignedTransaction};
pub use config::{Config, RpcConfig, OPERATOR_KEY_ENV};
pub use error::{Error, Result};
pub use service::MonitoringService;
