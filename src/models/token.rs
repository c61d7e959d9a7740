// Token and position value objects for a single Comet market
use alloy::primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

/// Capability tag attached to an asset when it is loaded.
///
/// The bulker exposes dedicated entry points for the chain's native gas token
/// and for the liquid-staking token, so the compiler and the allowance checks
/// branch on this tag instead of comparing symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssetClass {
    #[default]
    Standard,
    NativeToken,
    LiquidStaking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub class: AssetClass,
}

impl Token {
    pub fn new(address: Address, symbol: &str, name: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            class: AssetClass::Standard,
        }
    }

    pub fn with_class(mut self, class: AssetClass) -> Self {
        self.class = class;
        self
    }
}

/// The market's unit of account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAsset {
    #[serde(flatten)]
    pub token: Token,
    /// Oracle price, 8 decimals.
    pub price: I256,
    pub min_borrow: I256,
    /// Liquidity the protocol holds and can lend out.
    pub balance_of_comet: I256,
    /// Extra divisor applied when converting capacity into base units.
    #[serde(default)]
    pub price_adjustment: Option<I256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAssetWithAccountState {
    #[serde(flatten)]
    pub asset: BaseAsset,
    /// Positive when lending, negative when borrowing.
    pub balance: I256,
    pub wallet_balance: I256,
    pub allowance: U256,
    pub bulker_allowance: U256,
    /// Derived from the collateral set, see `services::capacity`.
    pub borrow_capacity: I256,
}

impl BaseAssetWithAccountState {
    pub fn address(&self) -> Address {
        self.asset.token.address
    }

    pub fn symbol(&self) -> &str {
        &self.asset.token.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.asset.token.decimals
    }

    pub fn class(&self) -> AssetClass {
        self.asset.token.class
    }

    /// Outstanding borrow, zero when the account is lending or neutral.
    pub fn borrow_balance(&self) -> I256 {
        if self.balance.is_negative() {
            self.balance.saturating_neg()
        } else {
            I256::ZERO
        }
    }

    pub fn is_borrowing(&self) -> bool {
        self.balance.is_negative()
    }

    pub fn is_supplying(&self) -> bool {
        self.balance.is_positive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralAsset {
    #[serde(flatten)]
    pub token: Token,
    /// Oracle price, 8 decimals.
    pub price: I256,
    /// 18-decimal factors.
    pub collateral_factor: I256,
    pub liquidate_collateral_factor: I256,
    pub liquidation_factor: I256,
    pub supply_cap: I256,
    pub total_supply: I256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenWithAccountState {
    #[serde(flatten)]
    pub asset: CollateralAsset,
    pub balance: I256,
    pub wallet_balance: I256,
    pub allowance: U256,
    pub bulker_allowance: U256,
}

impl TokenWithAccountState {
    pub fn address(&self) -> Address {
        self.asset.token.address
    }

    pub fn symbol(&self) -> &str {
        &self.asset.token.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.asset.token.decimals
    }

    pub fn class(&self) -> AssetClass {
        self.asset.token.class
    }
}

/// Looks up a collateral asset by address.
pub fn find_collateral(
    collaterals: &[TokenWithAccountState],
    address: Address,
) -> Option<&TokenWithAccountState> {
    collaterals.iter().find(|c| c.address() == address)
}
