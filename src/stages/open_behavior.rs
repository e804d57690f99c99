//! Stage-2 controller: market-open behavior.
//!
//! Hybrid mode: compute and freeze carry the raw 5-minute candles plus
//! the manually supplied previous-day baseline. The service derives
//! the full analytical breakdown from them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::WorkflowError;
use crate::model::common::{Stage, StageMode, TradeDate};
use crate::model::open_behavior::{
    OpenBehaviorFreeze, OpenBehaviorInputs, OpenBehaviorSnapshot,
};
use crate::store::SnapshotStore;

use super::traits::OpenBehaviorApi;

pub struct OpenBehaviorStage {
    api: Arc<dyn OpenBehaviorApi>,
    store: SnapshotStore<OpenBehaviorSnapshot>,
    can_freeze: AtomicBool,
}

impl OpenBehaviorStage {
    pub fn new(api: Arc<dyn OpenBehaviorApi>) -> Self {
        Self {
            api,
            store: SnapshotStore::new(Stage::OpenBehavior),
            can_freeze: AtomicBool::new(false),
        }
    }

    pub async fn preview(
        &self,
        trade_date: TradeDate,
    ) -> Result<OpenBehaviorSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            if let Some(held) = self.store.get() {
                return Ok(held);
            }
        }

        let seq = self.store.begin_request();
        match self.api.preview(trade_date).await {
            Ok(p) => {
                self.can_freeze.store(p.can_freeze, Ordering::Relaxed);
                self.store.apply(seq, p.snapshot);
                Ok(self
                    .store
                    .get()
                    .unwrap_or_else(|| OpenBehaviorSnapshot::manual_draft(trade_date)))
            }
            Err(e) => {
                warn!("[STAGE2] preview failed, degrading to manual: {}", e);
                self.store
                    .apply(seq, OpenBehaviorSnapshot::manual_draft(trade_date));
                Err(WorkflowError::Transport(e))
            }
        }
    }

    /// Evaluate candles against the baseline. Pure draft update; a
    /// repeat compute with different candles replaces the draft.
    /// Returns the store's view: a response that was superseded or
    /// raced a freeze never reaches the caller.
    pub async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &OpenBehaviorInputs,
    ) -> Result<OpenBehaviorSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::OpenBehavior,
                trade_date,
            });
        }

        let seq = self.store.begin_request();
        let resp = self
            .api
            .compute(trade_date, inputs)
            .await
            .map_err(WorkflowError::from_rejection)?;

        self.can_freeze.store(resp.can_freeze, Ordering::Relaxed);
        self.store.apply(seq, resp.snapshot.clone());
        Ok(self.store.get().unwrap_or(resp.snapshot))
    }

    pub async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &OpenBehaviorFreeze,
    ) -> Result<OpenBehaviorSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::OpenBehavior,
                trade_date,
            });
        }

        let snapshot = self
            .api
            .freeze(trade_date, finals)
            .await
            .map_err(WorkflowError::from_rejection)?;

        self.store.apply_frozen(trade_date, snapshot.clone())?;
        info!(
            "[STAGE2] open behavior frozen for {} (trade_allowed={})",
            trade_date,
            snapshot.trade_allowed()
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Option<OpenBehaviorSnapshot> {
        self.store.get()
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

    pub fn trade_allowed(&self) -> bool {
        self.store.get().map(|s| s.trade_allowed()).unwrap_or(false)
    }

    pub fn can_freeze(&self) -> bool {
        self.can_freeze.load(Ordering::Relaxed)
    }
}
