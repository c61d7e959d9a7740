// Gas estimation for compiled bulker calls
use std::sync::Arc;
use std::time::Duration;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::adapters::compound_v3::contracts::IBulker;
use crate::config::GasEstimatorSettings;
use crate::error::{EngineError, GasEstimationError};
use crate::models::{Action, BaseAssetWithAccountState, Market, TokenWithAccountState};
use crate::services::action_validator::validate_allowance_for_action;
use crate::services::bulker_compiler::{compile, BulkerTransaction};

/// One `eth_estimateGas` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimateRequest {
    pub from: Address,
    pub target: Address,
    pub selector: [u8; 4],
    pub args: Bytes,
    pub value: U256,
}

impl GasEstimateRequest {
    pub fn calldata(&self) -> Bytes {
        let mut data = Vec::with_capacity(4 + self.args.len());
        data.extend_from_slice(&self.selector);
        data.extend_from_slice(&self.args);
        data.into()
    }
}

#[async_trait]
pub trait GasRpc: Send + Sync {
    async fn estimate_gas(&self, request: &GasEstimateRequest) -> Result<u64, GasEstimationError>;
}

/// `GasRpc` over an HTTP JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct AlloyGasRpc {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
}

impl AlloyGasRpc {
    pub fn new(rpc_url: &str) -> Result<Self, GasEstimationError> {
        let url = rpc_url
            .parse()
            .map_err(|e| GasEstimationError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().on_http(url);
        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
        })
    }

    pub fn from_settings(settings: &GasEstimatorSettings) -> Result<Self, GasEstimationError> {
        let url = settings
            .rpc_url
            .as_deref()
            .ok_or_else(|| GasEstimationError::InvalidUrl("gas_estimator.rpc_url is not set".to_string()))?;
        Self::new(url)
    }
}

#[async_trait]
impl GasRpc for AlloyGasRpc {
    async fn estimate_gas(&self, request: &GasEstimateRequest) -> Result<u64, GasEstimationError> {
        let tx = TransactionRequest::default()
            .with_from(request.from)
            .with_to(request.target)
            .with_input(request.calldata())
            .with_value(request.value);

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(|e| GasEstimationError::Rpc(format!("{} ({})", e, self.rpc_url)))?;
        Ok(u64::try_from(gas).unwrap_or(u64::MAX))
    }
}

/// Content address of an action list. Estimates carry it so callers can
/// discard results computed for a queue that has since changed.
pub fn action_set_fingerprint(actions: &[Action]) -> Result<String, EngineError> {
    let canonical = serde_json::to_vec(actions)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Content address of a compiled call. Max amounts and call value are
/// already resolved against the position, so a new snapshot yields a new key.
pub fn transaction_fingerprint(transaction: &BulkerTransaction) -> Result<String, EngineError> {
    let canonical = serde_json::to_vec(transaction)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimate {
    pub fingerprint: String,
    /// Zero when the estimate could not be made.
    pub gas: u64,
}

impl GasEstimate {
    pub fn is_current(&self, actions: &[Action]) -> bool {
        action_set_fingerprint(actions)
            .map(|fingerprint| fingerprint == self.fingerprint)
            .unwrap_or(false)
    }

    pub fn is_unavailable(&self) -> bool {
        self.gas == 0
    }
}

pub struct GasEstimator<R: GasRpc> {
    rpc: Arc<R>,
    cache: Cache<String, u64>,
    settings: GasEstimatorSettings,
}

impl<R: GasRpc> GasEstimator<R> {
    pub fn new(rpc: R, settings: GasEstimatorSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.cache_capacity)
            .time_to_live(Duration::from_secs(settings.cache_ttl_seconds))
            .build();
        Self {
            rpc: Arc::new(rpc),
            cache,
            settings,
        }
    }

    /// Estimates gas for submitting `actions` through the market's bulker.
    ///
    /// Missing approvals, RPC failures and timeouts all yield a zero estimate;
    /// only a malformed action list is returned as an error.
    pub async fn estimate(
        &self,
        sender: Address,
        market: &Market,
        base_asset: &BaseAssetWithAccountState,
        collateral_assets: &[TokenWithAccountState],
        actions: &[Action],
    ) -> Result<GasEstimate, EngineError> {
        let fingerprint = action_set_fingerprint(actions)?;
        let unavailable = GasEstimate {
            fingerprint: fingerprint.clone(),
            gas: 0,
        };

        if actions.is_empty() {
            return Ok(unavailable);
        }

        for (index, action) in actions.iter().enumerate() {
            if let Err(reason) =
                validate_allowance_for_action(base_asset, collateral_assets, &actions[..index], action)
            {
                info!(action = %action.action_type(), %reason, "Skipping gas estimate, approval missing");
                return Ok(unavailable);
            }
        }

        let transaction = compile(sender, market, base_asset, collateral_assets, actions)?;
        let cache_key = format!("{}:{}:{}", market.id, sender, transaction_fingerprint(&transaction)?);
        if let Some(gas) = self.cache.get(&cache_key).await {
            debug!(%fingerprint, gas, "Gas estimate served from cache");
            return Ok(GasEstimate { fingerprint, gas });
        }

        let request = GasEstimateRequest {
            from: sender,
            target: transaction.target,
            selector: IBulker::invokeCall::SELECTOR,
            args: transaction.invoke_args(),
            value: transaction.call_value,
        };

        let timeout = Duration::from_millis(self.settings.timeout_ms);
        let gas = match tokio::time::timeout(timeout, self.rpc.estimate_gas(&request)).await {
            Ok(Ok(raw)) => {
                let gas = self.stabilize(raw);
                self.cache.insert(cache_key, gas).await;
                debug!(%fingerprint, raw, gas, "Gas estimated");
                gas
            }
            Ok(Err(e)) => {
                warn!(market = %market.id, error = %e, "Gas estimation failed");
                0
            }
            Err(_) => {
                warn!(market = %market.id, error = %GasEstimationError::Timeout(timeout), "Gas estimation failed");
                0
            }
        };

        Ok(GasEstimate { fingerprint, gas })
    }

    /// Pads the node's estimate and rounds it up to a coarse step, so the
    /// displayed figure does not jitter between polls.
    pub fn stabilize(&self, raw: u64) -> u64 {
        if raw == 0 {
            return 0;
        }
        let buffered = (raw as u128)
            .saturating_mul(10_000 + self.settings.buffer_bps as u128)
            .div_ceil(10_000);
        let step = self.settings.rounding_granularity.max(1) as u128;
        u64::try_from(buffered.div_ceil(step).saturating_mul(step)).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, BaseAsset, BulkerConfig, MarketId, Token};
    use alloy::primitives::I256;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const USDC: Address = Address::repeat_byte(0x01);
    const SENDER: Address = Address::repeat_byte(0xaa);

    struct FixedRpc {
        gas: u64,
        calls: AtomicUsize,
        last_request: Mutex<Option<GasEstimateRequest>>,
    }

    impl FixedRpc {
        fn new(gas: u64) -> Self {
            Self {
                gas,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl GasRpc for FixedRpc {
        async fn estimate_gas(&self, request: &GasEstimateRequest) -> Result<u64, GasEstimationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(self.gas)
        }
    }

    struct FailingRpc;

    #[async_trait]
    impl GasRpc for FailingRpc {
        async fn estimate_gas(&self, _request: &GasEstimateRequest) -> Result<u64, GasEstimationError> {
            Err(GasEstimationError::Rpc("execution reverted".to_string()))
        }
    }

    struct SlowRpc;

    #[async_trait]
    impl GasRpc for SlowRpc {
        async fn estimate_gas(&self, _request: &GasEstimateRequest) -> Result<u64, GasEstimationError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(1)
        }
    }

    fn market() -> Market {
        Market {
            id: MarketId::new(1, Address::repeat_byte(0xc0)),
            bulker: BulkerConfig {
                address: Address::repeat_byte(0xb0),
                supports_liquid_staking: true,
            },
            rewards: None,
        }
    }

    fn base(allowance: U256) -> BaseAssetWithAccountState {
        BaseAssetWithAccountState {
            asset: BaseAsset {
                token: Token::new(USDC, "USDC", "USD Coin", 6),
                price: I256::try_from(100_000_000i64).unwrap(),
                min_borrow: I256::ZERO,
                balance_of_comet: I256::try_from(1_000_000i64).unwrap(),
                price_adjustment: None,
            },
            balance: I256::ZERO,
            wallet_balance: I256::try_from(1_000i64).unwrap(),
            allowance,
            bulker_allowance: U256::ZERO,
            borrow_capacity: I256::ZERO,
        }
    }

    fn settings() -> GasEstimatorSettings {
        GasEstimatorSettings {
            timeout_ms: 50,
            ..GasEstimatorSettings::default()
        }
    }

    fn supply(amount: u128) -> Vec<Action> {
        vec![Action::Supply { asset: USDC, amount: Amount::exact(amount) }]
    }

    #[test]
    fn test_stabilize_pads_and_rounds_up() {
        let estimator = GasEstimator::new(FailingRpc, settings());
        assert_eq!(estimator.stabilize(100_000), 120_000);
        assert_eq!(estimator.stabilize(100_001), 121_000);
        assert_eq!(estimator.stabilize(0), 0);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = action_set_fingerprint(&supply(1)).unwrap();
        let b = action_set_fingerprint(&supply(2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, action_set_fingerprint(&supply(1)).unwrap());
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_estimate_is_cached_per_action_set() {
        let estimator = GasEstimator::new(FixedRpc::new(150_000), settings());
        let actions = supply(100);

        let first = estimator.estimate(SENDER, &market(), &base(U256::MAX), &[], &actions).await.unwrap();
        let second = estimator.estimate(SENDER, &market(), &base(U256::MAX), &[], &actions).await.unwrap();

        assert_eq!(first.gas, 180_000);
        assert_eq!(first, second);
        assert!(first.is_current(&actions));
        assert!(!first.is_current(&supply(101)));
        assert_eq!(estimator.rpc.calls.load(Ordering::SeqCst), 1);

        let request = estimator.rpc.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.target, Address::repeat_byte(0xb0));
        assert_eq!(&request.calldata()[..4], IBulker::invokeCall::SELECTOR.as_slice());
    }

    #[tokio::test]
    async fn test_new_snapshot_is_not_served_from_cache() {
        let estimator = GasEstimator::new(FixedRpc::new(150_000), settings());
        let actions = vec![Action::Supply { asset: USDC, amount: Amount::Max }];

        let before = base(U256::MAX);
        let mut after = base(U256::MAX);
        after.wallet_balance = I256::try_from(2_000i64).unwrap();

        estimator.estimate(SENDER, &market(), &before, &[], &actions).await.unwrap();
        estimator.estimate(SENDER, &market(), &before, &[], &actions).await.unwrap();
        assert_eq!(estimator.rpc.calls.load(Ordering::SeqCst), 1);

        let estimate = estimator.estimate(SENDER, &market(), &after, &[], &actions).await.unwrap();
        assert_eq!(estimator.rpc.calls.load(Ordering::SeqCst), 2);
        assert!(estimate.is_current(&actions));
    }

    #[tokio::test]
    async fn test_missing_approval_short_circuits() {
        let estimator = GasEstimator::new(FixedRpc::new(150_000), settings());
        let estimate = estimator
            .estimate(SENDER, &market(), &base(U256::from(10u64)), &[], &supply(100))
            .await
            .unwrap();
        assert!(estimate.is_unavailable());
        assert_eq!(estimator.rpc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rpc_failure_degrades_to_zero() {
        let estimator = GasEstimator::new(FailingRpc, settings());
        let estimate = estimator.estimate(SENDER, &market(), &base(U256::MAX), &[], &supply(1)).await.unwrap();
        assert_eq!(estimate.gas, 0);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_zero() {
        let estimator = GasEstimator::new(SlowRpc, settings());
        let estimate = estimator.estimate(SENDER, &market(), &base(U256::MAX), &[], &supply(1)).await.unwrap();
        assert_eq!(estimate.gas, 0);
    }

    #[tokio::test]
    async fn test_empty_queue_has_no_estimate() {
        let estimator = GasEstimator::new(FixedRpc::new(1), settings());
        let estimate = estimator.estimate(SENDER, &market(), &base(U256::MAX), &[], &[]).await.unwrap();
        assert!(estimate.is_unavailable());
    }

    #[test]
    fn test_alloy_rpc_rejects_bad_url() {
        assert!(matches!(AlloyGasRpc::new("not a url"), Err(GasEstimationError::InvalidUrl(_))));
        assert!(AlloyGasRpc::from_settings(&GasEstimatorSettings::default()).is_err());
    }
}
