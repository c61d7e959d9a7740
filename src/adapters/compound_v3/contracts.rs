// Compound V3 bulker interface and per-action payload encodings
use std::fmt;

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol,
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

// Bulker entry point; the data for each action is abi-encoded separately.
sol! {
    interface IBulker {
        function invoke(bytes32[] calldata actions, bytes[] calldata data) external payable;
    }
}

/// Action codes understood by the bulker, encoded on-chain as right-padded
/// ASCII `bytes32` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulkerOpcode {
    SupplyAsset,
    SupplyNativeToken,
    SupplyStEth,
    WithdrawAsset,
    WithdrawNativeToken,
    WithdrawStEth,
    ClaimReward,
}

impl BulkerOpcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkerOpcode::SupplyAsset => "ACTION_SUPPLY_ASSET",
            BulkerOpcode::SupplyNativeToken => "ACTION_SUPPLY_NATIVE_TOKEN",
            BulkerOpcode::SupplyStEth => "ACTION_SUPPLY_STETH",
            BulkerOpcode::WithdrawAsset => "ACTION_WITHDRAW_ASSET",
            BulkerOpcode::WithdrawNativeToken => "ACTION_WITHDRAW_NATIVE_TOKEN",
            BulkerOpcode::WithdrawStEth => "ACTION_WITHDRAW_STETH",
            BulkerOpcode::ClaimReward => "ACTION_CLAIM_REWARD",
        }
    }

    pub fn to_bytes32(&self) -> B256 {
        let name = self.as_str().as_bytes();
        let mut word = [0u8; 32];
        word[..name.len()].copy_from_slice(name);
        B256::from(word)
    }
}

impl fmt::Display for BulkerOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(comet, to, asset, amount)` for supplyTo / withdrawTo.
pub fn encode_asset_payload(comet: Address, to: Address, asset: Address, amount: U256) -> Bytes {
    (comet, to, asset, amount).abi_encode_params().into()
}

/// `(comet, to, amount)` for the native-token and stETH entry points.
pub fn encode_wrapped_payload(comet: Address, to: Address, amount: U256) -> Bytes {
    (comet, to, amount).abi_encode_params().into()
}

/// `(comet, rewards, src, shouldAccrue)` for claimReward.
pub fn encode_claim_payload(comet: Address, rewards: Address, src: Address) -> Bytes {
    (comet, rewards, src, true).abi_encode_params().into()
}
