// Borrow and liquidation capacity of a collateral set
use alloy::primitives::I256;

use crate::models::{BaseAsset, TokenWithAccountState};
use crate::utils::math::{pow10, WAD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    Borrow,
    Liquidation,
}

/// Value of one collateral position at the 8-decimal price scale.
pub fn collateral_dollar_value(collateral: &TokenWithAccountState) -> I256 {
    let balance = collateral.balance.max(I256::ZERO);
    balance.saturating_mul(collateral.asset.price) / pow10(collateral.decimals())
}

/// Sum of all collateral values at the 8-decimal price scale.
pub fn collateral_value(collaterals: &[TokenWithAccountState]) -> I256 {
    collaterals
        .iter()
        .fold(I256::ZERO, |acc, c| acc.saturating_add(collateral_dollar_value(c)))
}

/// Capacity of `collaterals`, in base-asset units.
///
/// Each term is floored after every multiply/divide pair, multiplying first,
/// so results line up with the protocol's own integer math.
pub fn capacity(kind: CapacityKind, base: &BaseAsset, collaterals: &[TokenWithAccountState]) -> I256 {
    let wad = I256::from_raw(WAD);

    let dollars = collaterals.iter().fold(I256::ZERO, |acc, c| {
        let factor = match kind {
            CapacityKind::Borrow => c.asset.collateral_factor,
            CapacityKind::Liquidation => c.asset.liquidate_collateral_factor,
        };
        acc.saturating_add(collateral_dollar_value(c).saturating_mul(factor) / wad)
    });

    if !base.price.is_positive() {
        return I256::ZERO;
    }

    let in_base = dollars.saturating_mul(pow10(base.token.decimals)) / base.price;
    match base.price_adjustment {
        Some(divisor) if divisor.is_positive() => in_base / divisor,
        _ => in_base,
    }
}

pub fn borrow_capacity(base: &BaseAsset, collaterals: &[TokenWithAccountState]) -> I256 {
    capacity(CapacityKind::Borrow, base, collaterals)
}

pub fn liquidation_capacity(base: &BaseAsset, collaterals: &[TokenWithAccountState]) -> I256 {
    capacity(CapacityKind::Liquidation, base, collaterals)
}
