// Queued protocol actions
use std::fmt;

use alloy::primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

use super::rewards::RewardAccountState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Supply,
    SupplyCollateral,
    Withdraw,
    WithdrawCollateral,
    Borrow,
    Repay,
    ClaimRewards,
}

impl ActionType {
    /// Types that move tokens from the wallet into the protocol.
    pub fn is_deposit(&self) -> bool {
        matches!(self, ActionType::Supply | ActionType::SupplyCollateral | ActionType::Repay)
    }

    /// Types that move tokens from the protocol back to the wallet.
    pub fn is_withdrawal(&self) -> bool {
        matches!(self, ActionType::Withdraw | ActionType::WithdrawCollateral | ActionType::Borrow)
    }

    /// Types that operate on the base asset rather than on collateral.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            ActionType::Supply | ActionType::Withdraw | ActionType::Borrow | ActionType::Repay
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Supply => "Supply",
            ActionType::SupplyCollateral => "SupplyCollateral",
            ActionType::Withdraw => "Withdraw",
            ActionType::WithdrawCollateral => "WithdrawCollateral",
            ActionType::Borrow => "Borrow",
            ActionType::Repay => "Repay",
            ActionType::ClaimRewards => "ClaimRewards",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action amount in the asset's fixed-point units.
///
/// `Max` is the `MAX_UINT256` sentinel: it resolves to the largest legal
/// amount given everything queued before it. On the wire an amount is the raw
/// `uint256`, so a deserialized `MAX_UINT256` always becomes `Max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "U256", into = "U256")]
pub enum Amount {
    Exact(U256),
    Max,
}

impl Amount {
    pub fn from_raw(raw: U256) -> Self {
        if raw == U256::MAX {
            Amount::Max
        } else {
            Amount::Exact(raw)
        }
    }

    pub fn exact(value: u128) -> Self {
        Amount::Exact(U256::from(value))
    }

    pub fn to_raw(&self) -> U256 {
        match self {
            Amount::Exact(value) => *value,
            Amount::Max => U256::MAX,
        }
    }

    /// `Exact(MAX_UINT256)` counts as the sentinel too.
    pub fn is_max(&self) -> bool {
        self.to_raw() == U256::MAX
    }

    /// Signed view of an exact amount. `None` for the sentinel.
    pub fn as_signed(&self) -> Option<I256> {
        match self {
            _ if self.is_max() => None,
            Amount::Exact(value) => Some(crate::utils::math::to_signed(*value)),
            Amount::Max => None,
        }
    }
}

impl From<U256> for Amount {
    fn from(raw: U256) -> Self {
        Amount::from_raw(raw)
    }
}

impl From<Amount> for U256 {
    fn from(amount: Amount) -> Self {
        amount.to_raw()
    }
}

/// Identity of a queued action: one entry per key may exist in a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub action_type: ActionType,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    Supply { asset: Address, amount: Amount },
    SupplyCollateral { asset: Address, amount: Amount },
    Withdraw { asset: Address, amount: Amount },
    WithdrawCollateral { asset: Address, amount: Amount },
    Borrow { asset: Address, amount: Amount },
    Repay { asset: Address, amount: Amount },
    ClaimRewards { rewards: RewardAccountState },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Supply { .. } => ActionType::Supply,
            Action::SupplyCollateral { .. } => ActionType::SupplyCollateral,
            Action::Withdraw { .. } => ActionType::Withdraw,
            Action::WithdrawCollateral { .. } => ActionType::WithdrawCollateral,
            Action::Borrow { .. } => ActionType::Borrow,
            Action::Repay { .. } => ActionType::Repay,
            Action::ClaimRewards { .. } => ActionType::ClaimRewards,
        }
    }

    /// Asset the action moves. For reward claims this is the reward token.
    pub fn asset(&self) -> Address {
        match self {
            Action::Supply { asset, .. }
            | Action::SupplyCollateral { asset, .. }
            | Action::Withdraw { asset, .. }
            | Action::WithdrawCollateral { asset, .. }
            | Action::Borrow { asset, .. }
            | Action::Repay { asset, .. } => *asset,
            Action::ClaimRewards { rewards } => rewards.reward_token.address,
        }
    }

    pub fn amount(&self) -> Option<Amount> {
        match self {
            Action::Supply { amount, .. }
            | Action::SupplyCollateral { amount, .. }
            | Action::Withdraw { amount, .. }
            | Action::WithdrawCollateral { amount, .. }
            | Action::Borrow { amount, .. }
            | Action::Repay { amount, .. } => Some(*amount),
            Action::ClaimRewards { .. } => None,
        }
    }

    /// Returns a copy carrying `amount`. Claims are returned unchanged.
    pub fn with_amount(&self, amount: Amount) -> Action {
        let asset = self.asset();
        match self.action_type() {
            ActionType::Supply => Action::Supply { asset, amount },
            ActionType::SupplyCollateral => Action::SupplyCollateral { asset, amount },
            ActionType::Withdraw => Action::Withdraw { asset, amount },
            ActionType::WithdrawCollateral => Action::WithdrawCollateral { asset, amount },
            ActionType::Borrow => Action::Borrow { asset, amount },
            ActionType::Repay => Action::Repay { asset, amount },
            ActionType::ClaimRewards => self.clone(),
        }
    }

    pub fn key(&self) -> ActionKey {
        let address = match self {
            Action::ClaimRewards { rewards } => rewards.comet,
            _ => self.asset(),
        };
        ActionKey { action_type: self.action_type(), address }
    }

    pub fn is_max(&self) -> bool {
        self.amount().map(|a| a.is_max()).unwrap_or(false)
    }
}
