//! Trade-day orchestrator.
//!
//! Pure composition and gating over the four stage controllers. No
//! network calls of its own: gates are a pure function of each stage's
//! settled frozen/enabled state, so the same stage states always yield
//! the same gate outputs.
//!
//! Stage 4 unlocks only after stage 1 and 2 are frozen, stage-3
//! execution is allowed, the stage-3 candidate list is persisted, and
//! stage 4 itself is not already frozen. A frozen stage 4 is a
//! completed decision: access closes because nothing is left to
//! construct.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::WorkflowError;
use crate::model::common::{Stage, TradeDate};
use crate::stages::construction::ConstructionStage;
use crate::stages::context::ContextStage;
use crate::stages::execution::ExecutionStage;
use crate::stages::open_behavior::OpenBehaviorStage;
use crate::stages::traits::{ConstructionApi, ContextApi, ExecutionApi, OpenBehaviorApi};

/// Read-only unlock flags for the day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayGates {
    pub can_access_stage1: bool,
    pub can_access_stage2: bool,
    pub can_access_stage3: bool,
    pub can_access_stage4: bool,
}

pub struct TradeDay {
    trade_date: TradeDate,
    pub context: ContextStage,
    pub open_behavior: OpenBehaviorStage,
    pub execution: ExecutionStage,
    pub construction: ConstructionStage,
    // Explicit init tokens: each stage is previewed once per unlock,
    // never re-triggered by incidental timing.
    initialized: Mutex<HashSet<Stage>>,
}

impl TradeDay {
    pub fn new<B>(backend: Arc<B>, trade_date: TradeDate) -> Self
    where
        B: ContextApi + OpenBehaviorApi + ExecutionApi + ConstructionApi + 'static,
    {
        Self {
            trade_date,
            context: ContextStage::new(backend.clone()),
            open_behavior: OpenBehaviorStage::new(backend.clone()),
            execution: ExecutionStage::new(backend.clone()),
            construction: ConstructionStage::new(backend),
            initialized: Mutex::new(HashSet::new()),
        }
    }

    pub fn trade_date(&self) -> TradeDate {
        self.trade_date
    }

    /// Pure gate computation. Infallible by construction: it only
    /// consumes already-resolved booleans.
    pub fn gates(&self) -> DayGates {
        let stage1_frozen = self.context.is_frozen();
        let stage2_frozen = self.open_behavior.is_frozen();
        let execution_enabled = self.execution.execution_enabled();
        let stage3_frozen = self.execution.candidates_persisted();
        let trade_frozen = self.construction.is_frozen();

        DayGates {
            can_access_stage1: true,
            can_access_stage2: stage1_frozen,
            can_access_stage3: stage1_frozen && stage2_frozen,
            can_access_stage4: stage1_frozen
                && stage2_frozen
                && execution_enabled
                && stage3_frozen
                && !trade_frozen,
        }
    }

    /// Preview each unlocked, not-yet-initialized stage exactly once.
    /// Call again after a freeze to initialize newly unlocked stages.
    /// Stages whose preview failed are returned with their error; they
    /// hold a manual draft and stay usable.
    pub async fn refresh(&self) -> Vec<(Stage, WorkflowError)> {
        let mut degraded = Vec::new();

        if self.claim(Stage::Context) {
            if let Err(e) = self.context.preview(self.trade_date).await {
                degraded.push((Stage::Context, e));
            }
        }

        let gates = self.gates();
        if gates.can_access_stage2 && self.claim(Stage::OpenBehavior) {
            if let Err(e) = self.open_behavior.preview(self.trade_date).await {
                degraded.push((Stage::OpenBehavior, e));
            }
        }

        let gates = self.gates();
        if gates.can_access_stage3 && self.claim(Stage::ExecutionControl) {
            if let Err(e) = self.execution.preview(self.trade_date).await {
                degraded.push((Stage::ExecutionControl, e));
            }
        }

        let gates = self.gates();
        if gates.can_access_stage4 && self.claim(Stage::TradeConstruction) {
            if let Err(e) = self.construction.preview(self.trade_date).await {
                degraded.push((Stage::TradeConstruction, e));
            }
        }

        degraded
    }

    fn claim(&self, stage: Stage) -> bool {
        let mut initialized = self.initialized.lock().unwrap();
        if initialized.contains(&stage) {
            return false;
        }
        initialized.insert(stage);
        debug!("[DAY] initializing {} for {}", stage, self.trade_date);
        true
    }
}
