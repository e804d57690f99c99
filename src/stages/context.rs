//! Stage-1 controller: pre-market context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::WorkflowError;
use crate::model::common::{Stage, StageMode, TradeDate};
use crate::model::context::{ContextFreeze, ContextInputs, ContextSnapshot};
use crate::store::SnapshotStore;

use super::traits::ContextApi;

pub struct ContextStage {
    api: Arc<dyn ContextApi>,
    store: SnapshotStore<ContextSnapshot>,
    can_freeze: AtomicBool,
}

impl ContextStage {
    pub fn new(api: Arc<dyn ContextApi>) -> Self {
        Self {
            api,
            store: SnapshotStore::new(Stage::Context),
            can_freeze: AtomicBool::new(false),
        }
    }

    /// Fetch the current snapshot. Never leaves the stage unusable:
    /// on transport failure the store degrades to an empty manual
    /// draft and the error is surfaced alongside. No-op once frozen.
    pub async fn preview(&self, trade_date: TradeDate) -> Result<ContextSnapshot, WorkflowError> {
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
                Ok(self.store.get().unwrap_or_else(|| {
                    ContextSnapshot::manual_draft(trade_date)
                }))
            }
            Err(e) => {
                warn!("[STAGE1] preview failed, degrading to manual: {}", e);
                self.store.apply(seq, ContextSnapshot::manual_draft(trade_date));
                Err(WorkflowError::Transport(e))
            }
        }
    }

    /// Submit trader inputs for normalization. Replaces the draft
    /// wholesale; on failure the draft is left untouched. Returns the
    /// store's view: a response that was superseded or raced a freeze
    /// never reaches the caller.
    pub async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ContextInputs,
    ) -> Result<ContextSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::Context,
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

    /// Persist the final context. Terminal: a second freeze is
    /// rejected and the held snapshot is never altered.
    pub async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ContextFreeze,
    ) -> Result<ContextSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::Context,
                trade_date,
            });
        }

        let snapshot = self
            .api
            .freeze(trade_date, finals)
            .await
            .map_err(WorkflowError::from_rejection)?;

        self.store.apply_frozen(trade_date, snapshot.clone())?;
        info!("[STAGE1] context frozen for {}", trade_date);
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Option<ContextSnapshot> {
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

    pub fn can_freeze(&self) -> bool {
        self.can_freeze.load(Ordering::Relaxed)
    }
}
