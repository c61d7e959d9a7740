// Projects a position forward through a sequence of queued actions
use alloy::primitives::I256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Action, ActionType, BaseAssetWithAccountState, TokenWithAccountState};
use crate::services::capacity::{borrow_capacity, collateral_value, liquidation_capacity};
use crate::utils::math::{take_percentage, BORROW_MAX_SCALE};

/// A position after some prefix of the queue has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedPosition {
    pub base_asset: BaseAssetWithAccountState,
    pub collateral_assets: Vec<TokenWithAccountState>,
    /// Collateral value at the 8-decimal price scale.
    pub collateral_value: I256,
    /// Liquidation threshold, in base-asset units.
    pub liquidation_capacity: I256,
}

impl ProjectedPosition {
    /// Starts a projection from an on-chain snapshot. Derived fields are
    /// recomputed rather than trusted.
    pub fn from_snapshot(
        base_asset: &BaseAssetWithAccountState,
        collateral_assets: &[TokenWithAccountState],
    ) -> Self {
        let mut position = Self {
            base_asset: base_asset.clone(),
            collateral_assets: collateral_assets.to_vec(),
            collateral_value: I256::ZERO,
            liquidation_capacity: I256::ZERO,
        };
        position.refresh_derived();
        position
    }

    fn refresh_derived(&mut self) {
        self.base_asset.borrow_capacity = borrow_capacity(&self.base_asset.asset, &self.collateral_assets);
        self.collateral_value = collateral_value(&self.collateral_assets);
        self.liquidation_capacity = liquidation_capacity(&self.base_asset.asset, &self.collateral_assets);
    }

    pub fn collateral(&self, address: alloy::primitives::Address) -> Option<&TokenWithAccountState> {
        self.collateral_assets.iter().find(|c| c.address() == address)
    }

    pub fn borrow_balance(&self) -> I256 {
        self.base_asset.borrow_balance()
    }

    /// Share of borrow capacity in use, in basis points.
    pub fn borrow_utilization_bps(&self) -> u32 {
        let borrow = self.borrow_balance();
        if borrow.is_zero() {
            return 0;
        }
        let capacity = self.base_asset.borrow_capacity;
        if !capacity.is_positive() {
            return u32::MAX;
        }
        let bps = borrow.saturating_mul(I256::from_raw(alloy::primitives::U256::from(10_000u64))) / capacity;
        u32::try_from(bps.into_raw()).unwrap_or(u32::MAX)
    }

    pub fn is_liquidatable(&self) -> bool {
        self.borrow_balance() > self.liquidation_capacity
    }

    /// Resolves the effective amount of `action` against this state.
    ///
    /// Exact amounts pass through; `Max` is resolved per action type. Claims
    /// carry no amount and resolve to zero.
    pub fn resolve_amount(&self, action: &Action) -> I256 {
        match action.amount() {
            None => I256::ZERO,
            Some(amount) => match amount.as_signed() {
                Some(exact) => exact,
                None => self.resolve_max(action),
            },
        }
    }

    fn resolve_max(&self, action: &Action) -> I256 {
        let base = &self.base_asset;
        let resolved = match action.action_type() {
            ActionType::Supply => base.wallet_balance,
            ActionType::Borrow => {
                let headroom = base.borrow_capacity.saturating_sub(base.borrow_balance());
                take_percentage(headroom, BORROW_MAX_SCALE)
            }
            ActionType::Repay => base.borrow_balance(),
            ActionType::Withdraw => base.balance,
            ActionType::WithdrawCollateral => self
                .collateral(action.asset())
                .map(|c| c.balance)
                .unwrap_or(I256::ZERO),
            ActionType::SupplyCollateral => self
                .collateral(action.asset())
                .map(|c| c.wallet_balance)
                .unwrap_or(I256::ZERO),
            ActionType::ClaimRewards => I256::ZERO,
        };
        resolved.max(I256::ZERO)
    }

    /// Applies one action, moving its resolved amount between the protocol
    /// balance and the wallet balance.
    pub fn apply(&mut self, action: &Action) {
        let action_type = action.action_type();
        if action_type == ActionType::ClaimRewards {
            return;
        }

        let amount = self.resolve_amount(action);
        let delta = if action_type.is_deposit() { amount } else { -amount };
        let asset = action.asset();

        if action_type.is_base() {
            if asset != self.base_asset.address() {
                debug!(%asset, action = %action_type, "Skipping action for asset outside the market");
                return;
            }
            self.base_asset.balance = self.base_asset.balance.saturating_add(delta);
            self.base_asset.wallet_balance = self.base_asset.wallet_balance.saturating_sub(delta);
        } else {
            match self.collateral_assets.iter_mut().find(|c| c.address() == asset) {
                Some(collateral) => {
                    collateral.balance = collateral.balance.saturating_add(delta);
                    collateral.wallet_balance = collateral.wallet_balance.saturating_sub(delta);
                }
                None => {
                    debug!(%asset, action = %action_type, "Skipping action for unknown collateral");
                    return;
                }
            }
        }

        self.refresh_derived();
    }
}

/// Folds `actions` left to right over the snapshot.
///
/// Order matters: each `Max` amount resolves against the projection of the
/// actions before it, never against the final state.
pub fn calculate_updated_balances(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    actions: &[Action],
) -> ProjectedPosition {
    actions.iter().fold(
        ProjectedPosition::from_snapshot(base_asset, collateral_assets),
        |mut position, action| {
            position.apply(action);
            position
        },
    )
}

/// Effective amount `action` would move if appended after `prior_actions`.
pub fn sanitized_amount_for_action(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    prior_actions: &[Action],
    action: &Action,
) -> I256 {
    calculate_updated_balances(base_asset, collateral_assets, prior_actions).resolve_amount(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, BaseAsset, CollateralAsset, Token};
    use alloy::primitives::{Address, U256};

    fn int(value: i128) -> I256 {
        I256::try_from(value).unwrap()
    }

    const USDC: Address = Address::repeat_byte(0x01);
    const WETH: Address = Address::repeat_byte(0x02);

    fn base(balance: i128, wallet: i128) -> BaseAssetWithAccountState {
        BaseAssetWithAccountState {
            asset: BaseAsset {
                token: Token::new(USDC, "USDC", "USD Coin", 6),
                price: int(100_000_000),
                min_borrow: int(100_000_000),
                balance_of_comet: int(10_000_000_000_000),
                price_adjustment: None,
            },
            balance: int(balance),
            wallet_balance: int(wallet),
            allowance: U256::MAX,
            bulker_allowance: U256::MAX,
            borrow_capacity: I256::ZERO,
        }
    }

    fn weth(balance: i128, wallet: i128) -> TokenWithAccountState {
        TokenWithAccountState {
            asset: CollateralAsset {
                token: Token::new(WETH, "WETH", "Wrapped Ether", 18),
                price: int(200_000_000_000),
                collateral_factor: int(825_000_000_000_000_000),
                liquidate_collateral_factor: int(895_000_000_000_000_000),
                liquidation_factor: int(950_000_000_000_000_000),
                supply_cap: int(350_000_000_000_000_000_000_000),
                total_supply: int(0),
            },
            balance: int(balance),
            wallet_balance: int(wallet),
            allowance: U256::MAX,
            bulker_allowance: U256::MAX,
        }
    }

    #[test]
    fn test_empty_queue_recomputes_capacity() {
        let projected = calculate_updated_balances(&base(0, 0), &[weth(10_000_000_000_000_000_000, 0)], &[]);
        assert_eq!(projected.base_asset.borrow_capacity, int(16_500_000_000));
        assert_eq!(projected.base_asset.balance, int(0));
    }

    #[test]
    fn test_supply_and_borrow_move_balances() {
        let actions = vec![
            Action::Supply { asset: USDC, amount: Amount::exact(250) },
            Action::Borrow { asset: USDC, amount: Amount::exact(1_000) },
        ];
        let projected = calculate_updated_balances(&base(0, 1_000), &[], &actions);
        assert_eq!(projected.base_asset.balance, int(-750));
        assert_eq!(projected.base_asset.wallet_balance, int(1_750));
    }

    #[test]
    fn test_collateral_changes_capacity() {
        let actions = vec![Action::SupplyCollateral {
            asset: WETH,
            amount: Amount::Max,
        }];
        let projected = calculate_updated_balances(&base(0, 0), &[weth(0, 10_000_000_000_000_000_000)], &actions);
        assert_eq!(projected.collateral_assets[0].balance, int(10_000_000_000_000_000_000));
        assert_eq!(projected.collateral_assets[0].wallet_balance, int(0));
        assert_eq!(projected.base_asset.borrow_capacity, int(16_500_000_000));
        assert_eq!(projected.liquidation_capacity, int(17_900_000_000));
    }

    #[test]
    fn test_max_borrow_keeps_headroom() {
        let action = Action::Borrow { asset: USDC, amount: Amount::Max };
        let amount = sanitized_amount_for_action(
            &base(-6_500_000_000, 0),
            &[weth(10_000_000_000_000_000_000, 0)],
            &[],
            &action,
        );
        // 0.9999 of the remaining 10,000 USDC
        assert_eq!(amount, int(9_999_000_000));
    }

    #[test]
    fn test_max_withdraw_collateral_depends_on_prefix() {
        let collaterals = [weth(5_000, 0)];
        let max = Action::WithdrawCollateral { asset: WETH, amount: Amount::Max };
        let partial = Action::WithdrawCollateral { asset: WETH, amount: Amount::exact(2_000) };

        assert_eq!(sanitized_amount_for_action(&base(0, 0), &collaterals, &[], &max), int(5_000));
        assert_eq!(
            sanitized_amount_for_action(&base(0, 0), &collaterals, &[partial], &max),
            int(3_000)
        );
    }

    #[test]
    fn test_max_repay_on_positive_balance_is_zero() {
        let action = Action::Repay { asset: USDC, amount: Amount::Max };
        assert_eq!(sanitized_amount_for_action(&base(500, 1_000), &[], &[], &action), I256::ZERO);
    }

    #[test]
    fn test_unknown_assets_are_skipped() {
        let actions = vec![Action::SupplyCollateral {
            asset: Address::repeat_byte(0x09),
            amount: Amount::exact(10),
        }];
        let snapshot = base(0, 0);
        let projected = calculate_updated_balances(&snapshot, &[weth(1, 1)], &actions);
        assert_eq!(projected.collateral_assets[0].balance, int(1));
        assert_eq!(projected.base_asset.balance, snapshot.balance);
    }

    #[test]
    fn test_utilization_and_liquidation() {
        let collaterals = [weth(10_000_000_000_000_000_000, 0)];
        let healthy = calculate_updated_balances(&base(-8_250_000_000, 0), &collaterals, &[]);
        assert_eq!(healthy.borrow_utilization_bps(), 5_000);
        assert!(!healthy.is_liquidatable());

        let underwater = calculate_updated_balances(&base(-18_000_000_000, 0), &collaterals, &[]);
        assert!(underwater.is_liquidatable());

        let lender = calculate_updated_balances(&base(1_000, 0), &[], &[]);
        assert_eq!(lender.borrow_utilization_bps(), 0);
    }
}
