//! User-signed transaction builders
//!
//! These tools never sign or submit. They return a fully encoded
//! `UnsignedTransaction` for the user's own wallet to sign; deposits,
//! withdrawals, and approvals are user-initiated flows, not operator
//! actions.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::{parse_units, ChainClient};
use crate::tools::{parse_input, schema_of, Tool};
use crate::Result;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApproveAssetInput {
    /// Amount of the asset to approve, in human-readable form
    pub amount: String,
}

/// Prepares an unsigned approval so the vault can spend the user's tokens.
pub struct ApproveAssetTool {
    chain: Arc<ChainClient>,
}

impl ApproveAssetTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for ApproveAssetTool {
    fn name(&self) -> &'static str {
        super::TOOL_APPROVE_ASSET
    }

    fn description(&self) -> &'static str {
        "Prepares an unsigned approval transaction so the vault can spend the user's asset tokens."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<ApproveAssetInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: ApproveAssetInput = parse_input(self.name(), input)?;
        let amount = parse_units(&input.amount)?;

        let tx = self.chain.build_approve_transaction(amount);
        Ok(json!({
            "unsigned_tx": tx,
            "message": format!(
                "Please sign this transaction to approve {} tokens for spending.",
                input.amount
            ),
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserDepositInput {
    /// Amount of the asset to deposit, in human-readable form
    pub amount: String,
}

/// Prepares an unsigned vault deposit for the user to sign.
pub struct UserDepositTool {
    chain: Arc<ChainClient>,
}

impl UserDepositTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for UserDepositTool {
    fn name(&self) -> &'static str {
        super::TOOL_USER_DEPOSIT
    }

    fn description(&self) -> &'static str {
        "Prepares an unsigned deposit transaction for the user to sign in their wallet."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<UserDepositInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: UserDepositInput = parse_input(self.name(), input)?;
        let assets = parse_units(&input.amount)?;

        let tx = self.chain.build_deposit_transaction(assets);
        Ok(json!({
            "unsigned_tx": tx,
            "message": format!("Please sign this deposit transaction for {} tokens.", input.amount),
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserWithdrawInput {
    /// Number of shares to withdraw, in human-readable form
    pub shares: String,
}

/// Prepares an unsigned vault withdrawal for the user to sign.
pub struct UserWithdrawTool {
    chain: Arc<ChainClient>,
}

impl UserWithdrawTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for UserWithdrawTool {
    fn name(&self) -> &'static str {
        super::TOOL_USER_WITHDRAW
    }

    fn description(&self) -> &'static str {
        "Prepares an unsigned withdrawal transaction for the user to sign in their wallet."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<UserWithdrawInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: UserWithdrawInput = parse_input(self.name(), input)?;
        let shares = parse_units(&input.shares)?;

        let tx = self.chain.build_withdraw_transaction(shares);
        Ok(json!({
            "unsigned_tx": tx,
            "message": format!("Please sign this withdraw transaction for {} shares.", input.shares),
        }))
    }
}
