//! Stage 2: market-open behavior.
//!
//! Full analytical breakdown of the first session minutes: initial range,
//! volatility state, VWAP behavior, range integrity, and the final
//! trade-allowed decision. The service derives everything from raw
//! 5-minute candles; in hybrid mode the trader supplies the candles and
//! the previous-day baseline manually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{StageMode, TradeDate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityState {
    Expanding,
    Contracting,
    Normal,
    Chaotic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VwapState {
    AboveVwap,
    BelowVwap,
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeHoldStatus {
    Held,
    BrokenUp,
    BrokenDown,
}

/// Raw 5-minute candle, input to compute and freeze.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandleInput {
    /// Session-local time label, e.g. "09:15".
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Complete service-derived breakdown.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenBehaviorDerived {
    pub avg_5m_range_prev_day: f64,

    pub ir_high: f64,
    pub ir_low: f64,
    pub ir_range: f64,
    pub ir_ratio: f64,

    pub volatility_state: VolatilityState,

    pub vwap_cross_count: u32,
    pub vwap_state: VwapState,

    pub range_hold_status: RangeHoldStatus,

    pub index_open_behavior: String,
    pub early_volatility: String,
    pub market_participation: String,

    pub trade_allowed: bool,
}

/// Partial draft while the analytical breakdown is incomplete.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpenBehaviorDraft {
    pub avg_5m_range_prev_day: Option<f64>,
    pub ir_high: Option<f64>,
    pub ir_low: Option<f64>,
    pub ir_range: Option<f64>,
    pub ir_ratio: Option<f64>,
    pub volatility_state: Option<VolatilityState>,
    pub vwap_cross_count: Option<u32>,
    pub vwap_state: Option<VwapState>,
    pub range_hold_status: Option<RangeHoldStatus>,
    pub index_open_behavior: Option<String>,
    pub early_volatility: Option<String>,
    pub market_participation: Option<String>,
    pub trade_allowed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OpenBehaviorBody {
    Automated(OpenBehaviorDerived),
    Manual(OpenBehaviorDraft),
}

impl OpenBehaviorDraft {
    /// The stage-2 mode rule: Automated only when every field the
    /// service is responsible for deriving is present. Total and
    /// deterministic; no hysteresis.
    pub fn into_body(self) -> OpenBehaviorBody {
        match self {
            OpenBehaviorDraft {
                avg_5m_range_prev_day: Some(avg_5m_range_prev_day),
                ir_high: Some(ir_high),
                ir_low: Some(ir_low),
                ir_range: Some(ir_range),
                ir_ratio: Some(ir_ratio),
                volatility_state: Some(volatility_state),
                vwap_cross_count: Some(vwap_cross_count),
                vwap_state: Some(vwap_state),
                range_hold_status: Some(range_hold_status),
                index_open_behavior: Some(index_open_behavior),
                early_volatility: Some(early_volatility),
                market_participation: Some(market_participation),
                trade_allowed: Some(trade_allowed),
            } => OpenBehaviorBody::Automated(OpenBehaviorDerived {
                avg_5m_range_prev_day,
                ir_high,
                ir_low,
                ir_range,
                ir_ratio,
                volatility_state,
                vwap_cross_count,
                vwap_state,
                range_hold_status,
                index_open_behavior,
                early_volatility,
                market_participation,
                trade_allowed,
            }),
            draft => OpenBehaviorBody::Manual(draft),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OpenBehaviorSnapshot {
    pub trade_date: TradeDate,
    pub body: OpenBehaviorBody,
    pub frozen_at: Option<DateTime<Utc>>,
}

impl OpenBehaviorSnapshot {
    pub fn manual_draft(trade_date: TradeDate) -> Self {
        Self {
            trade_date,
            body: OpenBehaviorBody::Manual(OpenBehaviorDraft::default()),
            frozen_at: None,
        }
    }

    pub fn mode(&self) -> StageMode {
        match &self.body {
            OpenBehaviorBody::Automated(_) => StageMode::Automated,
            OpenBehaviorBody::Manual(_) => StageMode::ManualInput,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }

    pub fn trade_allowed(&self) -> bool {
        match &self.body {
            OpenBehaviorBody::Automated(d) => d.trade_allowed,
            OpenBehaviorBody::Manual(d) => d.trade_allowed.unwrap_or(false),
        }
    }
}

/// Trader inputs for stage-2 compute: raw candles plus the manual
/// previous-day baseline (hybrid mode).
#[derive(Clone, Debug)]
pub struct OpenBehaviorInputs {
    pub candles: Vec<CandleInput>,
    pub avg_5m_range_prev_day: f64,
}

/// Final fields for stage-2 freeze.
#[derive(Clone, Debug)]
pub struct OpenBehaviorFreeze {
    pub candles: Vec<CandleInput>,
    pub avg_5m_range_prev_day: f64,
    pub reason: Option<String>,
}
