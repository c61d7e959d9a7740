pub mod action_queue;
pub mod action_validator;
pub mod balance_projector;
pub mod bulker_compiler;
pub mod capacity;
pub mod gas_estimator;

pub use action_queue::{reduce, ActionQueue, ChangeListener, QueueOperation};
pub use action_validator::{validate_adding_action, validate_allowance_for_action};
pub use balance_projector::{calculate_updated_balances, sanitized_amount_for_action, ProjectedPosition};
pub use bulker_compiler::{compile, optimize, BulkerTransaction};
pub use capacity::{borrow_capacity, collateral_value, liquidation_capacity, CapacityKind};
pub use gas_estimator::{
    action_set_fingerprint, transaction_fingerprint, AlloyGasRpc, GasEstimate, GasEstimateRequest, GasEstimator, GasRpc,
};
