// Client-local queue of pending actions for the selected market
use std::collections::HashMap;
use std::fmt;

use alloy::primitives::Address;
use tracing::{debug, info};

use crate::models::{
    Action, ActionKey, ActionType, BaseAssetWithAccountState, MarketId, RewardsState, TokenWithAccountState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOperation {
    AddOrUpdate(Action),
    Remove(Action),
    Clear,
}

/// Applies one operation to a queue.
///
/// `AddOrUpdate` replaces the entry with the same key in place, otherwise
/// appends. Insertion order is preserved for everything else.
pub fn reduce(actions: &[Action], operation: &QueueOperation) -> Vec<Action> {
    match operation {
        QueueOperation::AddOrUpdate(action) => {
            let key = action.key();
            let mut next = actions.to_vec();
            match next.iter().position(|a| a.key() == key) {
                Some(index) => next[index] = action.clone(),
                None => next.push(action.clone()),
            }
            next
        }
        QueueOperation::Remove(action) => {
            let key = action.key();
            actions.iter().filter(|a| a.key() != key).cloned().collect()
        }
        QueueOperation::Clear => Vec::new(),
    }
}

/// Called with the new queue contents after every change.
pub type ChangeListener = Box<dyn Fn(&[Action]) + Send + Sync>;

pub struct ActionQueue {
    selected_market: Option<MarketId>,
    actions: Vec<Action>,
    staged: HashMap<MarketId, Vec<Action>>,
    listener: Option<ChangeListener>,
}

impl fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionQueue")
            .field("selected_market", &self.selected_market)
            .field("actions", &self.actions)
            .field("staged", &self.staged)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionQueue {
    pub fn new() -> Self {
        Self {
            selected_market: None,
            actions: Vec::new(),
            staged: HashMap::new(),
            listener: None,
        }
    }

    pub fn with_listener(listener: ChangeListener) -> Self {
        Self {
            listener: Some(listener),
            ..Self::new()
        }
    }

    pub fn selected_market(&self) -> Option<MarketId> {
        self.selected_market
    }

    /// Raw queue contents, in insertion order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn dispatch(&mut self, operation: QueueOperation) {
        let next = reduce(&self.actions, &operation);
        if next == self.actions {
            return;
        }
        self.actions = next;
        debug!(operation = ?operation, queued = self.actions.len(), "Action queue updated");
        if let Some(listener) = &self.listener {
            listener(&self.actions);
        }
    }

    pub fn add_or_update_action(&mut self, action: Action) {
        self.dispatch(QueueOperation::AddOrUpdate(action));
    }

    pub fn remove_action(&mut self, action: &Action) {
        self.dispatch(QueueOperation::Remove(action.clone()));
    }

    pub fn clear_actions(&mut self) {
        self.dispatch(QueueOperation::Clear);
    }

    /// The queue is emptied once its transaction has been submitted.
    pub fn on_transaction_submitted(&mut self) {
        info!(market = ?self.selected_market, queued = self.actions.len(), "Clearing queue after submission");
        self.clear_actions();
    }

    /// Queues `actions` against `market`. If the market is not selected they
    /// are staged until it is.
    pub fn queue_actions(&mut self, market: MarketId, actions: Vec<Action>) {
        if self.selected_market == Some(market) {
            for action in actions {
                self.add_or_update_action(action);
            }
            return;
        }

        let staged = self.staged.entry(market).or_default();
        for action in actions {
            *staged = reduce(staged, &QueueOperation::AddOrUpdate(action));
        }
        debug!(%market, staged = staged.len(), "Staged actions for unselected market");
    }

    /// Switches the live queue to `market`. Switching clears the live queue,
    /// then any actions staged for `market` are flushed into it.
    pub fn select_market(&mut self, market: MarketId) {
        if self.selected_market != Some(market) {
            self.clear_actions();
            self.selected_market = Some(market);
            info!(%market, "Selected market");
        }

        if let Some(staged) = self.staged.remove(&market) {
            debug!(%market, count = staged.len(), "Flushing staged actions");
            for action in staged {
                self.add_or_update_action(action);
            }
        }
    }

    /// Queue contents resolved against the current market context.
    ///
    /// Actions on assets the market no longer lists are dropped, and reward
    /// claims pick up the latest reward state for the selected market.
    pub fn get_actions(
        &self,
        base_asset: &BaseAssetWithAccountState,
        collateral_assets: &[TokenWithAccountState],
        rewards_state: &RewardsState,
    ) -> Vec<Action> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::ClaimRewards { rewards } => {
                    let market = self.selected_market?;
                    let current = rewards_state.get(&market)?;
                    if current.comet != rewards.comet {
                        return None;
                    }
                    Some(Action::ClaimRewards { rewards: current.clone() })
                }
                _ => {
                    let asset = action.asset();
                    let known = if action.action_type().is_base() {
                        asset == base_asset.address()
                    } else {
                        collateral_assets.iter().any(|c| c.address() == asset)
                    };
                    if !known {
                        debug!(%asset, action = %action.action_type(), "Dropping action for unlisted asset");
                    }
                    known.then(|| action.clone())
                }
            })
            .collect()
    }

    /// The queued action for `(action_type, address)`, if any. For reward
    /// claims `address` is the comet address.
    pub fn get_pending_action(&self, action_type: ActionType, address: Address) -> Option<&Action> {
        let key = ActionKey { action_type, address };
        self.actions.iter().find(|a| a.key() == key)
    }
}
