//! Async seams between stage controllers and the external service.
//!
//! One trait per stage so each controller is independently testable
//! against a mock backend.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::common::TradeDate;
use crate::model::construction::{
    ConstructionFreeze, ConstructionInputs, ExecutionBlueprint, FrozenTrade, TradePlan,
};
use crate::model::context::{ContextFreeze, ContextInputs, ContextSnapshot};
use crate::model::execution::{ExecutionSnapshot, StockContext, TradeCandidate};
use crate::model::open_behavior::{OpenBehaviorFreeze, OpenBehaviorInputs, OpenBehaviorSnapshot};

pub type StageResult<T> = Result<T, TransportError>;

/// Stage-1 preview/compute payload: snapshot plus the service's
/// freeze-readiness flag.
#[derive(Clone, Debug)]
pub struct ContextPreview {
    pub snapshot: ContextSnapshot,
    pub can_freeze: bool,
}

#[derive(Clone, Debug)]
pub struct OpenBehaviorPreview {
    pub snapshot: OpenBehaviorSnapshot,
    pub can_freeze: bool,
}

/// Stage-3 preview/compute payload. The service carries its
/// freeze-readiness flag on every unfrozen stage-3 response.
#[derive(Clone, Debug)]
pub struct ExecutionPreview {
    pub snapshot: ExecutionSnapshot,
    pub can_freeze: bool,
}

/// Stage-4 preview payload: structural blueprints for the frozen
/// candidates.
#[derive(Clone, Debug)]
pub struct ConstructionPreview {
    pub candidates: Vec<ExecutionBlueprint>,
}

#[async_trait]
pub trait ContextApi: Send + Sync {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ContextPreview>;
    async fn compute(&self, trade_date: TradeDate, inputs: &ContextInputs)
        -> StageResult<ContextPreview>;
    async fn freeze(&self, trade_date: TradeDate, finals: &ContextFreeze)
        -> StageResult<ContextSnapshot>;
}

#[async_trait]
pub trait OpenBehaviorApi: Send + Sync {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<OpenBehaviorPreview>;
    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &OpenBehaviorInputs,
    ) -> StageResult<OpenBehaviorPreview>;
    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &OpenBehaviorFreeze,
    ) -> StageResult<OpenBehaviorSnapshot>;
}

#[async_trait]
pub trait ExecutionApi: Send + Sync {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ExecutionPreview>;
    async fn compute(
        &self,
        trade_date: TradeDate,
        stocks: &[StockContext],
    ) -> StageResult<ExecutionPreview>;
    async fn freeze(
        &self,
        trade_date: TradeDate,
        candidates: &[TradeCandidate],
    ) -> StageResult<ExecutionSnapshot>;
}

#[async_trait]
pub trait ConstructionApi: Send + Sync {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ConstructionPreview>;
    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ConstructionInputs,
    ) -> StageResult<TradePlan>;
    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ConstructionFreeze,
    ) -> StageResult<FrozenTrade>;
}
