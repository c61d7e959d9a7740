// Compiles a queue of actions into a single bulker invocation
use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol_types::SolCall,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::compound_v3::contracts::{
    encode_asset_payload, encode_claim_payload, encode_wrapped_payload, BulkerOpcode, IBulker,
};
use crate::error::EngineError;
use crate::models::{
    Action, ActionType, Amount, AssetClass, BaseAssetWithAccountState, Market, TokenWithAccountState,
};
use crate::services::balance_projector::{calculate_updated_balances, sanitized_amount_for_action, ProjectedPosition};
use crate::utils::math::{take_percentage, to_unsigned, NATIVE_REPAY_BUFFER};

/// Everything needed to submit (or estimate) one bulker call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkerTransaction {
    pub target: Address,
    pub opcodes: Vec<BulkerOpcode>,
    pub action_codes: Vec<B256>,
    pub call_data: Vec<Bytes>,
    /// Native token to attach to the call.
    pub call_value: U256,
}

impl BulkerTransaction {
    pub fn is_empty(&self) -> bool {
        self.action_codes.is_empty()
    }

    /// ABI-encoded arguments of `invoke(bytes32[],bytes[])`, without selector.
    pub fn invoke_args(&self) -> Bytes {
        let call = IBulker::invokeCall {
            actions: self.action_codes.clone(),
            data: self.call_data.clone(),
        };
        let mut out = Vec::with_capacity(call.abi_encoded_size());
        call.abi_encode_raw(&mut out);
        out.into()
    }

    /// Full calldata of `invoke(bytes32[],bytes[])`.
    pub fn invoke_calldata(&self) -> Bytes {
        let call = IBulker::invokeCall {
            actions: self.action_codes.clone(),
            data: self.call_data.clone(),
        };
        call.abi_encode().into()
    }
}

/// Optimises and encodes `actions` for the market's bulker.
pub fn compile(
    sender: Address,
    market: &Market,
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    actions: &[Action],
) -> Result<BulkerTransaction, EngineError> {
    let optimized = optimize(base_asset, collateral_assets, actions)?;

    let mut transaction = BulkerTransaction {
        target: market.bulker.address,
        opcodes: Vec::with_capacity(optimized.len()),
        action_codes: Vec::with_capacity(optimized.len()),
        call_data: Vec::with_capacity(optimized.len()),
        call_value: U256::ZERO,
    };

    for (index, action) in optimized.iter().enumerate() {
        let encoded = encode_action(
            sender,
            market,
            base_asset,
            collateral_assets,
            &optimized[..index],
            action,
        )?;
        transaction.opcodes.push(encoded.opcode);
        transaction.action_codes.push(encoded.opcode.to_bytes32());
        transaction.call_data.push(encoded.payload);
        transaction.call_value = transaction.call_value.saturating_add(encoded.value);
    }

    info!(
        market = %market.id,
        %sender,
        queued = actions.len(),
        compiled = transaction.action_codes.len(),
        call_value = %transaction.call_value,
        "Compiled bulker transaction"
    );
    Ok(transaction)
}

/// Merges `Repay(MAX)` into a later `Supply` and `Withdraw(MAX)` into a later
/// `Borrow`. The merged action takes the slot of the removed one.
pub fn optimize(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    actions: &[Action],
) -> Result<Vec<Action>, EngineError> {
    let merged = merge_max_into_later(
        base_asset,
        collateral_assets,
        actions.to_vec(),
        ActionType::Repay,
        ActionType::Supply,
    )?;
    merge_max_into_later(
        base_asset,
        collateral_assets,
        merged,
        ActionType::Withdraw,
        ActionType::Borrow,
    )
}

fn merge_max_into_later(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    mut actions: Vec<Action>,
    first: ActionType,
    second: ActionType,
) -> Result<Vec<Action>, EngineError> {
    let Some(first_index) = actions
        .iter()
        .position(|a| a.action_type() == first && a.is_max())
    else {
        return Ok(actions);
    };
    let Some(second_index) = actions
        .iter()
        .skip(first_index + 1)
        .position(|a| a.action_type() == second)
        .map(|offset| first_index + 1 + offset)
    else {
        return Ok(actions);
    };

    if actions.iter().filter(|a| a.action_type() == first).count() > 1 {
        return Err(EngineError::AmbiguousOptimization(first));
    }
    if actions.iter().filter(|a| a.action_type() == second).count() > 1 {
        return Err(EngineError::AmbiguousOptimization(second));
    }

    let first_amount = sanitized_amount_for_action(
        base_asset,
        collateral_assets,
        &actions[..first_index],
        &actions[first_index],
    );
    let second_amount = sanitized_amount_for_action(
        base_asset,
        collateral_assets,
        &actions[..second_index],
        &actions[second_index],
    );
    let total = to_unsigned(first_amount.saturating_add(second_amount));

    debug!(
        removed = %first,
        merged_into = %second,
        %total,
        "Merging max action into later action"
    );

    let merged = actions[second_index].with_amount(Amount::Exact(total));
    actions.remove(second_index);
    actions[first_index] = merged;
    Ok(actions)
}

struct EncodedAction {
    opcode: BulkerOpcode,
    payload: Bytes,
    value: U256,
}

fn asset_class(
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    action: &Action,
) -> Result<AssetClass, EngineError> {
    let asset = action.asset();
    if action.action_type().is_base() {
        if asset != base_asset.address() {
            return Err(EngineError::UnknownAsset(asset));
        }
        return Ok(base_asset.class());
    }
    collateral_assets
        .iter()
        .find(|c| c.address() == asset)
        .map(|c| c.class())
        .ok_or(EngineError::UnknownAsset(asset))
}

fn opcode_for(market: &Market, action_type: ActionType, class: AssetClass) -> Result<BulkerOpcode, EngineError> {
    if action_type == ActionType::ClaimRewards {
        return Ok(BulkerOpcode::ClaimReward);
    }
    let deposit = action_type.is_deposit();
    match class {
        AssetClass::Standard if deposit => Ok(BulkerOpcode::SupplyAsset),
        AssetClass::Standard => Ok(BulkerOpcode::WithdrawAsset),
        AssetClass::NativeToken if deposit => Ok(BulkerOpcode::SupplyNativeToken),
        AssetClass::NativeToken => Ok(BulkerOpcode::WithdrawNativeToken),
        AssetClass::LiquidStaking if !market.bulker.supports_liquid_staking => {
            Err(EngineError::UnmappedOpcode { action_type, class })
        }
        AssetClass::LiquidStaking if deposit => Ok(BulkerOpcode::SupplyStEth),
        AssetClass::LiquidStaking => Ok(BulkerOpcode::WithdrawStEth),
    }
}

/// Amount written into the calldata.
///
/// Comet resolves `MAX_UINT256` itself only for base-asset repay and
/// withdraw; every other max is resolved here against the prior actions.
fn encoded_amount(pre: &ProjectedPosition, action: &Action) -> U256 {
    match action.amount() {
        None => U256::ZERO,
        Some(amount) if amount.is_max() => match action.action_type() {
            ActionType::Repay | ActionType::Withdraw => U256::MAX,
            _ => to_unsigned(pre.resolve_amount(action)),
        },
        Some(amount) => amount.to_raw(),
    }
}

fn encode_action(
    sender: Address,
    market: &Market,
    base_asset: &BaseAssetWithAccountState,
    collateral_assets: &[TokenWithAccountState],
    prior: &[Action],
    action: &Action,
) -> Result<EncodedAction, EngineError> {
    let comet = market.comet();

    if let Action::ClaimRewards { rewards } = action {
        return Ok(EncodedAction {
            opcode: BulkerOpcode::ClaimReward,
            payload: encode_claim_payload(rewards.comet, rewards.rewards, sender),
            value: U256::ZERO,
        });
    }

    let action_type = action.action_type();
    let class = asset_class(base_asset, collateral_assets, action)?;
    let opcode = opcode_for(market, action_type, class)?;
    let pre = calculate_updated_balances(base_asset, collateral_assets, prior);
    let amount = encoded_amount(&pre, action);
    let mut value = U256::ZERO;

    if class == AssetClass::NativeToken && action_type.is_deposit() {
        if action_type == ActionType::Repay && action.is_max() {
            if !pre.base_asset.is_borrowing() {
                return Err(EngineError::ContradictoryRepayMax {
                    symbol: pre.base_asset.symbol().to_string(),
                });
            }
            // The bulker resolves the max itself; attach enough to cover
            // interest accrued before inclusion.
            value = to_unsigned(take_percentage(pre.base_asset.borrow_balance(), NATIVE_REPAY_BUFFER));
        } else {
            value = amount;
        }
    }

    let payload = match opcode {
        BulkerOpcode::SupplyAsset | BulkerOpcode::WithdrawAsset => {
            encode_asset_payload(comet, sender, action.asset(), amount)
        }
        _ => encode_wrapped_payload(comet, sender, amount),
    };

    Ok(EncodedAction { opcode, payload, value })
}
