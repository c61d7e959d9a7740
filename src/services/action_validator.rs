// Feasibility checks for a candidate action against the projected queue
use tracing::debug;

use crate::error::{Rejection, ValidationResult};
use crate::models::{Action, ActionType, AssetClass, BaseAssetWithAccountState, TokenWithAccountState};
use crate::services::balance_projector::{calculate_updated_balances, ProjectedPosition};
use crate::utils::math::{format_token_amount, to_unsigned};

/// Decides whether `candidate` can be appended to `queued`.
///
/// The queue is projected first, so every rule sees the state the candidate
/// would actually execute against.
pub fn validate_adding_action(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    queued: &[Action],
    candidate: &Action,
) -> ValidationResult {
    let pre = calculate_updated_balances(base_asset, collateral_assets, queued);
    let result = validate_against(&pre, candidate);
    if let Err(reason) = &result {
        debug!(action = %candidate.action_type(), asset = %candidate.asset(), %reason, "Action rejected");
    }
    result
}

fn validate_against(pre: &ProjectedPosition, candidate: &Action) -> ValidationResult {
    let amount = pre.resolve_amount(candidate);
    let is_max = candidate.is_max();
    let base = &pre.base_asset;

    match candidate.action_type() {
        ActionType::Borrow => {
            if base.is_supplying() {
                return Err(Rejection::MustWithdrawFullBalance {
                    symbol: base.symbol().to_string(),
                });
            }
            let borrow_balance = base.borrow_balance();
            let resulting = borrow_balance.saturating_add(amount);
            if !is_max && resulting > base.borrow_capacity {
                return Err(Rejection::ExceedsBorrowCapacity);
            }
            if resulting < base.asset.min_borrow {
                return Err(Rejection::MinimumBorrow {
                    amount: format_token_amount(base.asset.min_borrow, base.decimals()),
                    symbol: base.symbol().to_string(),
                });
            }
            if amount > base.asset.balance_of_comet {
                return Err(Rejection::InsufficientLiquidity);
            }
            Ok(())
        }
        ActionType::Supply => {
            if base.is_borrowing() {
                return Err(Rejection::MustRepayBorrowFirst);
            }
            if !is_max && amount > base.wallet_balance {
                return Err(Rejection::ExceedsWalletBalance);
            }
            Ok(())
        }
        ActionType::Repay => {
            let exceeds = if is_max {
                base.wallet_balance < base.borrow_balance()
            } else {
                amount > base.wallet_balance
            };
            if exceeds {
                return Err(Rejection::ExceedsWalletBalance);
            }
            Ok(())
        }
        ActionType::SupplyCollateral => {
            let collateral = pre
                .collateral(candidate.asset())
                .ok_or(Rejection::UnknownCollateral)?;
            if amount > collateral.wallet_balance {
                return Err(Rejection::ExceedsWalletBalance);
            }
            if amount.saturating_add(collateral.asset.total_supply) > collateral.asset.supply_cap {
                return Err(Rejection::ExceedsSupplyCap);
            }
            Ok(())
        }
        ActionType::Withdraw => {
            if base.is_borrowing() {
                return Err(Rejection::MustRepayBorrowFirst);
            }
            if !is_max && amount > base.balance {
                return Err(Rejection::ExceedsBalance);
            }
            let needed = if is_max { base.balance } else { amount };
            if needed > base.asset.balance_of_comet {
                return Err(Rejection::InsufficientLiquidity);
            }
            Ok(())
        }
        ActionType::WithdrawCollateral => {
            let collateral = pre
                .collateral(candidate.asset())
                .ok_or(Rejection::UnknownCollateral)?;
            if !is_max && amount > collateral.balance {
                return Err(Rejection::ExceedsBalance);
            }
            let borrow_balance = base.borrow_balance();
            if !borrow_balance.is_zero() {
                let mut post = pre.clone();
                post.apply(candidate);
                if post.base_asset.borrow_capacity < borrow_balance {
                    return Err(Rejection::BorrowWillExceedCapacity);
                }
            }
            Ok(())
        }
        ActionType::ClaimRewards => Ok(()),
    }
}

/// Checks that on-chain approvals cover `candidate`'s resolved amount.
///
/// Which approval applies depends on the asset class: generic ERC-20 deposits
/// spend the comet allowance, liquid-staking deposits are pulled by the
/// bulker, and withdrawals routed through the bulker's native or
/// liquid-staking unwrapping need the bulker to be an authorised manager.
pub fn validate_allowance_for_action(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    queued: &[Action],
    candidate: &Action,
) -> ValidationResult {
    let action_type = candidate.action_type();
    if action_type == ActionType::ClaimRewards {
        return Ok(());
    }

    let pre = calculate_updated_balances(base_asset, collateral_assets, queued);
    let amount = to_unsigned(pre.resolve_amount(candidate));

    let (class, allowance, bulker_allowance) = if action_type.is_base() {
        let base = &pre.base_asset;
        (base.class(), base.allowance, base.bulker_allowance)
    } else {
        let collateral = pre
            .collateral(candidate.asset())
            .ok_or(Rejection::UnknownCollateral)?;
        (collateral.class(), collateral.allowance, collateral.bulker_allowance)
    };

    let approved = if action_type.is_deposit() {
        match class {
            AssetClass::Standard => allowance >= amount,
            AssetClass::LiquidStaking => bulker_allowance >= amount,
            AssetClass::NativeToken => true,
        }
    } else {
        match class {
            AssetClass::Standard => true,
            AssetClass::NativeToken | AssetClass::LiquidStaking => !pre.base_asset.bulker_allowance.is_zero(),
        }
    };

    if approved {
        Ok(())
    } else {
        debug!(action = %action_type, asset = %candidate.asset(), %amount, "Approval does not cover action");
        Err(Rejection::ApprovalFailed)
    }
}
