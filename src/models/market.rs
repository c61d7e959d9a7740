use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// A Comet deployment on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketId {
    pub chain_id: u64,
    pub comet: Address,
}

impl MarketId {
    pub fn new(chain_id: u64, comet: Address) -> Self {
        Self { chain_id, comet }
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.comet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkerConfig {
    pub address: Address,
    /// Mainnet bulkers expose the stETH wrap/unwrap entry points.
    pub supports_liquid_staking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub bulker: BulkerConfig,
    /// CometRewards contract, if the chain has one.
    pub rewards: Option<Address>,
}

impl Market {
    pub fn comet(&self) -> Address {
        self.id.comet
    }
}
