//! Error types for the vault sentinel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Tool input validation failed: {0}")]
    Validation(String),

    #[error("Chain read failed after {attempts} attempts: {message}")]
    ChainRead { attempts: u32, message: String },

    #[error("Chain write failed: {0}")]
    ChainWrite(String),

    #[error("Price feed error: {0}")]
    PriceFeed(String),

    #[error("Decision strategy error: {0}")]
    Agent(String),

    #[error("Scheduler error in job '{job}': {message}")]
    Scheduler { job: String, message: String },

    #[error("Report delivery failed: {0}")]
    Report(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
