//! Stage-4 controller: trade construction.
//!
//! Preview → compute → freeze. Reloading the preview clears any
//! previously computed (un-frozen) plan. Freeze is only reachable when
//! the last computed plan is READY; a BLOCKED plan is rejected
//! client-side with its block reason before any network call.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::WorkflowError;
use crate::model::common::{Stage, StageMode, TradeDate};
use crate::model::construction::{
    ConstructionBody, ConstructionFreeze, ConstructionInputs, ConstructionSnapshot, FrozenTrade,
    TradePlan, TradeStatus,
};
use crate::store::SnapshotStore;

use super::traits::ConstructionApi;

pub struct ConstructionStage {
    api: Arc<dyn ConstructionApi>,
    store: SnapshotStore<ConstructionSnapshot>,
}

impl ConstructionStage {
    pub fn new(api: Arc<dyn ConstructionApi>) -> Self {
        Self {
            api,
            store: SnapshotStore::new(Stage::TradeConstruction),
        }
    }

    /// Load structural blueprints for the frozen candidates. Resets
    /// the computed plan: a stale plan must not survive a context
    /// reload.
    pub async fn preview(
        &self,
        trade_date: TradeDate,
    ) -> Result<ConstructionSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            if let Some(held) = self.store.get() {
                return Ok(held);
            }
        }

        let seq = self.store.begin_request();
        match self.api.preview(trade_date).await {
            Ok(p) => {
                let snapshot = ConstructionSnapshot {
                    trade_date,
                    body: ConstructionBody::Draft {
                        candidates: p.candidates,
                        plan: None,
                    },
                    frozen_at: None,
                };
                self.store.apply(seq, snapshot);
                Ok(self
                    .store
                    .get()
                    .unwrap_or_else(|| ConstructionSnapshot::manual_draft(trade_date)))
            }
            Err(e) => {
                warn!("[STAGE4] preview failed, degrading to manual: {}", e);
                self.store
                    .apply(seq, ConstructionSnapshot::manual_draft(trade_date));
                Err(WorkflowError::Transport(e))
            }
        }
    }

    /// Ask the service for the risk math on one selected candidate.
    /// The resulting plan is reviewable and replaceable until freeze.
    /// Returns the plan the store accepted; a superseded response
    /// yields the newer plan instead.
    pub async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ConstructionInputs,
    ) -> Result<TradePlan, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::TradeConstruction,
                trade_date,
            });
        }

        let seq = self.store.begin_request();
        let plan = self
            .api
            .compute(trade_date, inputs)
            .await
            .map_err(WorkflowError::from_rejection)?;

        let candidates = match self.store.get().map(|s| s.body) {
            Some(ConstructionBody::Draft { candidates, .. }) => candidates,
            _ => Vec::new(),
        };
        self.store.apply(
            seq,
            ConstructionSnapshot {
                trade_date,
                body: ConstructionBody::Draft {
                    candidates,
                    plan: Some(plan.clone()),
                },
                frozen_at: None,
            },
        );
        Ok(self
            .store
            .get()
            .and_then(|s| s.plan().cloned())
            .unwrap_or(plan))
    }

    /// Persist the final trade. Requires a READY computed plan for the
    /// same symbol; the frozen trade is the permanent record of the
    /// day's execution intent.
    pub async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ConstructionFreeze,
    ) -> Result<FrozenTrade, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::TradeConstruction,
                trade_date,
            });
        }

        match self.store.get().as_ref().and_then(|s| s.plan().cloned()) {
            None => {
                return Err(WorkflowError::Validation {
                    message: "no computed trade plan to freeze".to_string(),
                })
            }
            Some(plan) if plan.trade_status == TradeStatus::Blocked => {
                return Err(WorkflowError::Validation {
                    message: plan
                        .block_reason
                        .unwrap_or_else(|| "trade plan is blocked".to_string()),
                })
            }
            Some(plan) if plan.symbol != finals.symbol => {
                return Err(WorkflowError::Validation {
                    message: format!(
                        "computed plan is for {}, not {}",
                        plan.symbol, finals.symbol
                    ),
                })
            }
            Some(_) => {}
        }

        let trade = self
            .api
            .freeze(trade_date, finals)
            .await
            .map_err(WorkflowError::from_rejection)?;

        self.store
            .apply_frozen(trade_date, ConstructionSnapshot::frozen(trade.clone()))?;
        info!(
            "[STAGE4] trade frozen for {}: {} {:?} qty={}",
            trade_date, trade.symbol, trade.direction, trade.quantity
        );
        Ok(trade)
    }

    pub fn snapshot(&self) -> Option<ConstructionSnapshot> {
        self.store.get()
    }

    pub fn plan(&self) -> Option<TradePlan> {
        self.store.get().and_then(|s| s.plan().cloned())
    }

    pub fn frozen_trade(&self) -> Option<FrozenTrade> {
        match self.store.get().map(|s| s.body) {
            Some(ConstructionBody::Frozen(trade)) => Some(trade),
            _ => None,
        }
    }

    pub fn mode(&self) -> StageMode {
        self.store
            .get()
            .map(|s| s.mode())
            .unwrap_or(StageMode::ManualInput)
    }

    pub fn is_frozen(&self) -> bool {
        self.store.is_frozen()
    }
}
