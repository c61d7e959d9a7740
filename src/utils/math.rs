use alloy::primitives::{I256, U256};
use serde::{Deserialize, Serialize};

/// 1.0 in 18-decimal fixed point.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Oracle prices carry 8 decimals.
pub const PRICE_DECIMALS: u8 = 8;

/// 0.9999: headroom kept when resolving a max borrow, so price movement
/// between estimation and inclusion does not make the borrow revert.
pub const BORROW_MAX_SCALE: U256 = U256::from_limbs([999_900_000_000_000_000, 0, 0, 0]);

/// 1.000005: extra native value attached to a max repay paid in the gas token.
pub const NATIVE_REPAY_BUFFER: U256 = U256::from_limbs([1_000_005_000_000_000_000, 0, 0, 0]);

/// `10^decimals` as a signed 256-bit integer.
pub fn pow10(decimals: u8) -> I256 {
    let ten = U256::from(10u64);
    let value = (0..decimals).fold(U256::from(1u64), |acc, _| acc.saturating_mul(ten));
    to_signed(value)
}

/// Reinterprets an unsigned amount, saturating at `I256::MAX`.
pub fn to_signed(value: U256) -> I256 {
    if value > I256::MAX.into_raw() {
        I256::MAX
    } else {
        I256::from_raw(value)
    }
}

/// Unsigned view of a signed amount; negative values clamp to zero.
pub fn to_unsigned(value: I256) -> U256 {
    if value.is_negative() {
        U256::ZERO
    } else {
        value.into_raw()
    }
}

/// `x * scale / 1e18`, truncating.
pub fn take_percentage(value: I256, scale_wad: U256) -> I256 {
    value.saturating_mul(I256::from_raw(scale_wad)) / I256::from_raw(WAD)
}

/// Display currency for token values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eth,
}

impl Currency {
    /// Whether an asset with `symbol` is already denominated in this currency.
    pub fn denominates(&self, symbol: &str) -> bool {
        match self {
            Currency::Usd => matches!(symbol, "USD" | "USDC" | "USDbC" | "USDC.e"),
            Currency::Eth => matches!(symbol, "ETH" | "WETH"),
        }
    }
}

/// Value of `amount` expressed in `currency`.
///
/// `price` is the 8-decimal price of the asset in `currency`. When the asset
/// is itself denominated in `currency` the amount is returned unchanged.
pub fn get_token_value(amount: I256, currency: Currency, price: I256, symbol: &str) -> I256 {
    if currency.denominates(symbol) {
        return amount;
    }
    amount.saturating_mul(price) / pow10(PRICE_DECIMALS)
}

/// Renders a fixed-point amount as a decimal string without trailing zeros.
pub fn format_token_amount(amount: I256, decimals: u8) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    let magnitude = amount.unsigned_abs();
    let scale = pow10(decimals).into_raw();
    let whole = magnitude / scale;
    let fraction = magnitude % scale;

    if fraction.is_zero() {
        return format!("{sign}{whole}");
    }

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{sign}{whole}.{}", padded.trim_end_matches('0'))
}
