//! Stage 4: trade construction.
//!
//! Preview loads structural blueprints for the frozen candidates,
//! compute asks the service for the risk math (entry/stop/quantity/
//! target), freeze persists the final trade record. A frozen trade is
//! the permanent record of the day's execution intent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{StageMode, TradeDate};
use super::execution::{StrategyUsed, TradeDirection};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Ready,
    Blocked,
}

/// Structural evidence for one candidate, loaded at preview time.
/// Evidence fields are nullable; the service omits what it cannot see.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionBlueprint {
    pub trade_date: TradeDate,
    pub symbol: String,
    pub direction: TradeDirection,
    pub strategy_used: StrategyUsed,

    pub gap_high: Option<f64>,
    pub gap_low: Option<f64>,
    pub intraday_high: Option<f64>,
    pub intraday_low: Option<f64>,
    pub last_higher_low: Option<f64>,
    pub vwap_value: Option<f64>,

    pub structure_valid: bool,
}

/// Risk inputs the trader supplies to compute and freeze.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub capital: f64,
    pub risk_percent: f64,
    pub entry_buffer: f64,
    pub r_multiple: f64,
}

/// Service-computed trade plan, reviewable before freeze.
#[derive(Clone, Debug, PartialEq)]
pub struct TradePlan {
    pub trade_date: TradeDate,
    pub symbol: String,
    pub direction: TradeDirection,
    pub strategy_used: StrategyUsed,

    pub entry_price: f64,
    pub stop_loss: f64,
    pub risk_per_share: f64,
    pub quantity: u32,
    pub target_price: f64,

    pub trade_status: TradeStatus,
    pub block_reason: Option<String>,

    pub constructed_at: DateTime<Utc>,
}

/// The canonical frozen trade record. Never mutated in place.
#[derive(Clone, Debug, PartialEq)]
pub struct FrozenTrade {
    pub trade_date: TradeDate,
    pub symbol: String,
    pub direction: TradeDirection,
    pub strategy_used: StrategyUsed,

    pub entry_price: f64,
    pub stop_loss: f64,
    pub risk_per_share: f64,
    pub quantity: u32,
    pub target_price: f64,

    pub trade_status: TradeStatus,
    pub block_reason: Option<String>,

    pub risk: RiskParams,
    pub rationale: Option<String>,

    pub frozen_at: DateTime<Utc>,
}

/// Stage-4 snapshot body. The frozen shape is structurally different
/// from the draft shape, so the union is explicit.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstructionBody {
    Draft {
        candidates: Vec<ExecutionBlueprint>,
        plan: Option<TradePlan>,
    },
    Frozen(FrozenTrade),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstructionSnapshot {
    pub trade_date: TradeDate,
    pub body: ConstructionBody,
    pub frozen_at: Option<DateTime<Utc>>,
}

impl ConstructionSnapshot {
    pub fn manual_draft(trade_date: TradeDate) -> Self {
        Self {
            trade_date,
            body: ConstructionBody::Draft {
                candidates: Vec::new(),
                plan: None,
            },
            frozen_at: None,
        }
    }

    pub fn frozen(trade: FrozenTrade) -> Self {
        Self {
            trade_date: trade.trade_date,
            frozen_at: Some(trade.frozen_at),
            body: ConstructionBody::Frozen(trade),
        }
    }

    pub fn mode(&self) -> StageMode {
        match &self.body {
            // Mode is fixed once frozen.
            ConstructionBody::Frozen(_) => StageMode::Automated,
            ConstructionBody::Draft { candidates, .. } => {
                if candidates.is_empty() {
                    StageMode::ManualInput
                } else {
                    StageMode::Automated
                }
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }

    pub fn plan(&self) -> Option<&TradePlan> {
        match &self.body {
            ConstructionBody::Draft { plan, .. } => plan.as_ref(),
            ConstructionBody::Frozen(_) => None,
        }
    }
}

/// Compute request: one selected candidate plus risk inputs.
#[derive(Clone, Debug)]
pub struct ConstructionInputs {
    pub symbol: String,
    pub risk: RiskParams,
}

/// Freeze request: same inputs plus an optional trader rationale.
#[derive(Clone, Debug)]
pub struct ConstructionFreeze {
    pub symbol: String,
    pub risk: RiskParams,
    pub rationale: Option<String>,
}
