//! Stage-3 controller: execution control and candidate selection.
//!
//! Preview never mutates server state; compute evaluates the supplied
//! stock contexts without persisting; freeze persists the final
//! candidate list only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::WorkflowError;
use crate::model::common::{Stage, StageMode, TradeDate};
use crate::model::execution::{ExecutionSnapshot, StockContext, TradeCandidate};
use crate::store::SnapshotStore;

use super::traits::ExecutionApi;

pub struct ExecutionStage {
    api: Arc<dyn ExecutionApi>,
    store: SnapshotStore<ExecutionSnapshot>,
    can_freeze: AtomicBool,
}

impl ExecutionStage {
    pub fn new(api: Arc<dyn ExecutionApi>) -> Self {
        Self {
            api,
            store: SnapshotStore::new(Stage::ExecutionControl),
            can_freeze: AtomicBool::new(false),
        }
    }

    pub async fn preview(&self, trade_date: TradeDate) -> Result<ExecutionSnapshot, WorkflowError> {
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
                    .unwrap_or_else(|| ExecutionSnapshot::manual_draft(trade_date)))
            }
            Err(e) => {
                warn!("[STAGE3] preview failed, degrading to manual: {}", e);
                self.store
                    .apply(seq, ExecutionSnapshot::manual_draft(trade_date));
                Err(WorkflowError::Transport(e))
            }
        }
    }

    /// Evaluate the trader-supplied stock contexts. Candidates in the
    /// response are ephemeral until frozen. Returns the store's view:
    /// a response that was superseded or raced a freeze never reaches
    /// the caller.
    pub async fn compute(
        &self,
        trade_date: TradeDate,
        stocks: &[StockContext],
    ) -> Result<ExecutionSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::ExecutionControl,
                trade_date,
            });
        }

        let seq = self.store.begin_request();
        let resp = self
            .api
            .compute(trade_date, stocks)
            .await
            .map_err(WorkflowError::from_rejection)?;

        self.can_freeze.store(resp.can_freeze, Ordering::Relaxed);
        self.store.apply(seq, resp.snapshot.clone());
        Ok(self.store.get().unwrap_or(resp.snapshot))
    }

    /// Persist the accepted candidate list. The list becomes immutable
    /// as part of the frozen snapshot.
    pub async fn freeze(
        &self,
        trade_date: TradeDate,
        candidates: &[TradeCandidate],
    ) -> Result<ExecutionSnapshot, WorkflowError> {
        if self.store.is_frozen() {
            return Err(WorkflowError::AlreadyFrozen {
                stage: Stage::ExecutionControl,
                trade_date,
            });
        }

        let snapshot = self
            .api
            .freeze(trade_date, candidates)
            .await
            .map_err(WorkflowError::from_rejection)?;

        self.store.apply_frozen(trade_date, snapshot.clone())?;
        info!(
            "[STAGE3] candidates frozen for {} ({} candidates)",
            trade_date,
            snapshot.candidates.len()
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Option<ExecutionSnapshot> {
        self.store.get()
    }

    pub fn candidates(&self) -> Vec<TradeCandidate> {
        self.store.get().map(|s| s.candidates).unwrap_or_default()
    }

    pub fn candidates_mode(&self) -> StageMode {
        self.store
            .get()
            .map(|s| s.candidates_mode())
            .unwrap_or(StageMode::ManualInput)
    }

    /// True once the candidate list is persisted.
    pub fn candidates_persisted(&self) -> bool {
        self.store
            .get()
            .map(|s| s.candidates_persisted())
            .unwrap_or(false)
    }

    pub fn execution_enabled(&self) -> bool {
        self.store
            .get()
            .map(|s| s.control.execution_enabled)
            .unwrap_or(false)
    }

    pub fn is_frozen(&self) -> bool {
        self.store.is_frozen()
    }

    pub fn can_freeze(&self) -> bool {
        self.can_freeze.load(Ordering::Relaxed)
    }
}
