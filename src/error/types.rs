// Engine error types
use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::models::{ActionType, AssetClass};

/// Reasons an action cannot be added to the queue.
///
/// These are expected outcomes shown to the user; the `Display` output is the
/// message rendered next to the disabled action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Amount Exceeds Borrow Capacity")]
    ExceedsBorrowCapacity,

    #[error("Minimum Borrow of {amount} {symbol}")]
    MinimumBorrow { amount: String, symbol: String },

    #[error("Not Enough Market Liquidity")]
    InsufficientLiquidity,

    #[error("Must Withdraw Full {symbol} Balance")]
    MustWithdrawFullBalance { symbol: String },

    #[error("Amount Exceeds Wallet Balance")]
    ExceedsWalletBalance,

    #[error("Must Repay Borrow First")]
    MustRepayBorrowFirst,

    #[error("Collateral Asset Doesn't Exist")]
    UnknownCollateral,

    #[error("Amount Exceeds Supply Cap")]
    ExceedsSupplyCap,

    #[error("Amount Exceeds Balance")]
    ExceedsBalance,

    #[error("Borrow Balance Will Exceed Capacity")]
    BorrowWillExceedCapacity,

    #[error("Approval Failed")]
    ApprovalFailed,
}

/// Defects in the caller's input or configuration.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No bulker opcode for {action_type} on {class:?} asset")]
    UnmappedOpcode { action_type: ActionType, class: AssetClass },

    #[error("Max repay requested while {symbol} balance is not negative")]
    ContradictoryRepayMax { symbol: String },

    #[error("Asset {0} is not part of the market")]
    UnknownAsset(Address),

    #[error("Batch contains more than one {0} action")]
    AmbiguousOptimization(ActionType),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures at the gas-estimation RPC boundary.
#[derive(Error, Debug, Clone)]
pub enum GasEstimationError {
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Gas estimation timed out after {0:?}")]
    Timeout(Duration),
}

pub type ValidationResult = Result<(), Rejection>;
