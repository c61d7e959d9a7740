use std::collections::HashMap;

use alloy::primitives::{Address, I256};
use serde::{Deserialize, Serialize};

use super::market::MarketId;
use super::token::Token;

/// Rewards accrued by an account in one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccountState {
    pub comet: Address,
    /// CometRewards contract paying out for `comet`.
    pub rewards: Address,
    pub reward_token: Token,
    pub owed: I256,
}

/// Reward state for every market the account touches, supplied by the
/// rewards fetcher.
#[derive(Debug, Clone, Default)]
pub struct RewardsState {
    accounts: HashMap<MarketId, RewardAccountState>,
}

impl RewardsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, market: MarketId, state: RewardAccountState) {
        self.accounts.insert(market, state);
    }

    pub fn get(&self, market: &MarketId) -> Option<&RewardAccountState> {
        self.accounts.get(market)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
