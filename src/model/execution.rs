//! Stage 3: execution control and candidate selection.
//!
//! Two layers in one snapshot: index-level permission (what the day
//! allows at all) and the per-stock candidate funnel. The snapshot
//! always carries both, so unlike stages 1/2/4 its body is not a
//! two-variant union; the candidate funnel's mode is recomputed from
//! whether candidates have been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{StageMode, TradeDate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    Long,
    Short,
}

/// Strategy assigned to a candidate, or the no-trade sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyUsed {
    GapFollow,
    Momentum,
    NoTrade,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceVsVwap {
    Above,
    Below,
}

/// Canonical per-stock input for hybrid manual evaluation.
/// The trader supplies every field; the service evaluates deterministically.
#[derive(Clone, Debug, PartialEq)]
pub struct StockContext {
    pub symbol: String,

    // Layer 1: tradability
    pub avg_traded_value_20d: f64,
    pub atr_pct: f64,
    pub abnormal_candle: bool,

    // Layer 2: relative strength vs index
    pub stock_open_0915: f64,
    pub stock_current_price: f64,
    pub index_open_0915: f64,
    pub index_current_price: f64,

    // Layer 3: strategy fit
    pub gap_pct: f64,
    pub gap_hold: bool,
    pub price_vs_vwap: PriceVsVwap,
    pub structure_valid: bool,
}

/// One proposed tradable instrument. Ephemeral until stage 3 freezes.
/// Structural evidence is nullable: the service omits what it cannot
/// see, and a frozen candidate keeps whatever evidence it shipped with.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeCandidate {
    pub symbol: String,
    pub direction: TradeDirection,
    pub strategy_used: StrategyUsed,

    pub rs_value: Option<f64>,

    pub gap_high: Option<f64>,
    pub gap_low: Option<f64>,
    pub intraday_high: Option<f64>,
    pub intraday_low: Option<f64>,
    pub last_higher_low: Option<f64>,

    pub yesterday_close: Option<f64>,
    pub vwap_value: Option<f64>,

    pub structure_valid: bool,

    pub reason: String,
}

/// Index-level permission block (stage 3A).
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionControl {
    pub market_context: String,
    pub trade_permission: String,
    pub allowed_strategies: Vec<String>,
    pub max_trades_allowed: u32,
    pub execution_enabled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionSnapshot {
    pub trade_date: TradeDate,
    pub control: ExecutionControl,
    pub candidates: Vec<TradeCandidate>,
    pub generated_at: DateTime<Utc>,
    pub frozen_at: Option<DateTime<Utc>>,
}

impl ExecutionSnapshot {
    /// Locked-down draft used when preview fails outright.
    pub fn manual_draft(trade_date: TradeDate) -> Self {
        Self {
            trade_date,
            control: ExecutionControl {
                market_context: String::new(),
                trade_permission: String::new(),
                allowed_strategies: Vec::new(),
                max_trades_allowed: 0,
                execution_enabled: false,
            },
            candidates: Vec::new(),
            generated_at: Utc::now(),
            frozen_at: None,
        }
    }

    /// Candidate-funnel mode: Automated once candidates are persisted,
    /// ManualInput while the trader still has to feed stock contexts.
    pub fn candidates_mode(&self) -> StageMode {
        if self.frozen_at.is_some() && !self.candidates.is_empty() {
            StageMode::Automated
        } else {
            StageMode::ManualInput
        }
    }

    /// The candidate list counts as finalized only when persisted.
    pub fn candidates_persisted(&self) -> bool {
        self.candidates_mode() == StageMode::Automated
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }
}
