//! Wire format for the external analytics service.
//!
//! The service speaks flat camelCase JSON; the internal model is a
//! tagged union over idiomatic Rust naming. This module is the only
//! place wire names appear. Decoding recomputes each stage's mode from
//! field completeness rather than trusting a server flag; encoding is
//! the exact inverse, so conversion is total and lossless both ways.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{StageMode, TradeDate};
use crate::model::construction::{
    ConstructionFreeze, ConstructionInputs, ExecutionBlueprint, FrozenTrade, RiskParams,
    TradePlan, TradeStatus,
};
use crate::model::context::{
    ContextBody, ContextDraft, ContextFreeze, ContextInputs, ContextSnapshot, GapContext,
    MarketBias,
};
use crate::model::execution::{
    ExecutionControl, ExecutionSnapshot, PriceVsVwap, StockContext, StrategyUsed, TradeCandidate,
    TradeDirection,
};
use crate::model::open_behavior::{
    CandleInput, OpenBehaviorBody, OpenBehaviorDraft, OpenBehaviorFreeze, OpenBehaviorInputs,
    OpenBehaviorSnapshot, RangeHoldStatus, VolatilityState, VwapState,
};
use crate::stages::traits::{
    ConstructionPreview, ContextPreview, ExecutionPreview, OpenBehaviorPreview,
};

/// Bare trade-date request body, shared by every preview endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRequest {
    pub trade_date: TradeDate,
}

/* =====================================================
   Stage 1: pre-market context
===================================================== */

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshotWire {
    pub trade_date: TradeDate,
    pub market_bias: Option<MarketBias>,
    pub gap_context: Option<GapContext>,
    pub premarket_notes: Option<String>,
    pub frozen_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPreviewWire {
    pub snapshot: Option<ContextSnapshotWire>,
    pub can_freeze: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextComputeRequest {
    pub trade_date: TradeDate,
    pub market_bias: MarketBias,
    pub gap_context: GapContext,
    pub premarket_notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFreezeRequest {
    pub trade_date: TradeDate,
    pub market_bias: MarketBias,
    pub premarket_notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFrozenWire {
    pub snapshot: ContextSnapshotWire,
    pub frozen: bool,
}

pub fn decode_context(w: ContextSnapshotWire) -> ContextSnapshot {
    ContextSnapshot {
        trade_date: w.trade_date,
        body: ContextDraft {
            market_bias: w.market_bias,
            gap_context: w.gap_context,
            premarket_notes: w.premarket_notes,
        }
        .into_body(),
        frozen_at: w.frozen_at,
    }
}

pub fn encode_context(s: &ContextSnapshot) -> ContextSnapshotWire {
    let (market_bias, gap_context, premarket_notes) = match &s.body {
        ContextBody::Automated(d) => (
            Some(d.market_bias),
            Some(d.gap_context),
            d.premarket_notes.clone(),
        ),
        ContextBody::Manual(d) => (d.market_bias, d.gap_context, d.premarket_notes.clone()),
    };
    ContextSnapshotWire {
        trade_date: s.trade_date,
        market_bias,
        gap_context,
        premarket_notes,
        frozen_at: s.frozen_at,
    }
}

pub fn decode_context_preview(trade_date: TradeDate, w: ContextPreviewWire) -> ContextPreview {
    ContextPreview {
        snapshot: w
            .snapshot
            .map(decode_context)
            .unwrap_or_else(|| ContextSnapshot::manual_draft(trade_date)),
        can_freeze: w.can_freeze,
    }
}

pub fn encode_context_compute(trade_date: TradeDate, i: &ContextInputs) -> ContextComputeRequest {
    ContextComputeRequest {
        trade_date,
        market_bias: i.market_bias,
        gap_context: i.gap_context,
        premarket_notes: i.premarket_notes.clone(),
    }
}

pub fn encode_context_freeze(trade_date: TradeDate, f: &ContextFreeze) -> ContextFreezeRequest {
    ContextFreezeRequest {
        trade_date,
        market_bias: f.market_bias,
        premarket_notes: f.premarket_notes.clone(),
    }
}

/* =====================================================
   Stage 2: market-open behavior
===================================================== */

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBehaviorSnapshotWire {
    pub trade_date: TradeDate,

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

    pub frozen_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBehaviorPreviewWire {
    pub snapshot: Option<OpenBehaviorSnapshotWire>,
    pub can_freeze: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBehaviorComputeRequest {
    pub trade_date: TradeDate,
    pub candles: Vec<CandleInput>,
    pub avg_5m_range_prev_day: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBehaviorFreezeRequest {
    pub trade_date: TradeDate,
    pub candles: Vec<CandleInput>,
    pub avg_5m_range_prev_day: f64,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBehaviorFrozenWire {
    pub snapshot: OpenBehaviorSnapshotWire,
    pub frozen: bool,
}

pub fn decode_open_behavior(w: OpenBehaviorSnapshotWire) -> OpenBehaviorSnapshot {
    OpenBehaviorSnapshot {
        trade_date: w.trade_date,
        body: OpenBehaviorDraft {
            avg_5m_range_prev_day: w.avg_5m_range_prev_day,
            ir_high: w.ir_high,
            ir_low: w.ir_low,
            ir_range: w.ir_range,
            ir_ratio: w.ir_ratio,
            volatility_state: w.volatility_state,
            vwap_cross_count: w.vwap_cross_count,
            vwap_state: w.vwap_state,
            range_hold_status: w.range_hold_status,
            index_open_behavior: w.index_open_behavior,
            early_volatility: w.early_volatility,
            market_participation: w.market_participation,
            trade_allowed: w.trade_allowed,
        }
        .into_body(),
        frozen_at: w.frozen_at,
    }
}

pub fn encode_open_behavior(s: &OpenBehaviorSnapshot) -> OpenBehaviorSnapshotWire {
    let d = match &s.body {
        OpenBehaviorBody::Automated(d) => OpenBehaviorDraft {
            avg_5m_range_prev_day: Some(d.avg_5m_range_prev_day),
            ir_high: Some(d.ir_high),
            ir_low: Some(d.ir_low),
            ir_range: Some(d.ir_range),
            ir_ratio: Some(d.ir_ratio),
            volatility_state: Some(d.volatility_state),
            vwap_cross_count: Some(d.vwap_cross_count),
            vwap_state: Some(d.vwap_state),
            range_hold_status: Some(d.range_hold_status),
            index_open_behavior: Some(d.index_open_behavior.clone()),
            early_volatility: Some(d.early_volatility.clone()),
            market_participation: Some(d.market_participation.clone()),
            trade_allowed: Some(d.trade_allowed),
        },
        OpenBehaviorBody::Manual(d) => d.clone(),
    };
    OpenBehaviorSnapshotWire {
        trade_date: s.trade_date,
        avg_5m_range_prev_day: d.avg_5m_range_prev_day,
        ir_high: d.ir_high,
        ir_low: d.ir_low,
        ir_range: d.ir_range,
        ir_ratio: d.ir_ratio,
        volatility_state: d.volatility_state,
        vwap_cross_count: d.vwap_cross_count,
        vwap_state: d.vwap_state,
        range_hold_status: d.range_hold_status,
        index_open_behavior: d.index_open_behavior,
        early_volatility: d.early_volatility,
        market_participation: d.market_participation,
        trade_allowed: d.trade_allowed,
        frozen_at: s.frozen_at,
    }
}

pub fn decode_open_behavior_preview(
    trade_date: TradeDate,
    w: OpenBehaviorPreviewWire,
) -> OpenBehaviorPreview {
    OpenBehaviorPreview {
        snapshot: w
            .snapshot
            .map(decode_open_behavior)
            .unwrap_or_else(|| OpenBehaviorSnapshot::manual_draft(trade_date)),
        can_freeze: w.can_freeze,
    }
}

pub fn encode_open_behavior_compute(
    trade_date: TradeDate,
    i: &OpenBehaviorInputs,
) -> OpenBehaviorComputeRequest {
    OpenBehaviorComputeRequest {
        trade_date,
        candles: i.candles.clone(),
        avg_5m_range_prev_day: i.avg_5m_range_prev_day,
    }
}

pub fn encode_open_behavior_freeze(
    trade_date: TradeDate,
    f: &OpenBehaviorFreeze,
) -> OpenBehaviorFreezeRequest {
    OpenBehaviorFreezeRequest {
        trade_date,
        candles: f.candles.clone(),
        avg_5m_range_prev_day: f.avg_5m_range_prev_day,
        reason: f.reason.clone(),
    }
}

/* =====================================================
   Stage 3: execution control & candidates
===================================================== */

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCandidateWire {
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

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockContextWire {
    pub symbol: String,

    pub avg_traded_value_20d: f64,
    pub atr_pct: f64,
    pub abnormal_candle: bool,

    pub stock_open_0915: f64,
    pub stock_current_price: f64,
    pub index_open_0915: f64,
    pub index_current_price: f64,

    pub gap_pct: f64,
    pub gap_hold: bool,
    pub price_vs_vwap: PriceVsVwap,
    pub structure_valid: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshotWire {
    pub trade_date: TradeDate,

    pub market_context: String,
    pub trade_permission: String,
    pub allowed_strategies: Vec<String>,
    pub max_trades_allowed: u32,
    pub execution_enabled: bool,

    pub candidates_mode: StageMode,
    pub candidates: Vec<TradeCandidateWire>,

    pub generated_at: DateTime<Utc>,
    pub frozen_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPreviewWire {
    pub snapshot: ExecutionSnapshotWire,
    pub can_freeze: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionFrozenWire {
    pub snapshot: ExecutionSnapshotWire,
    pub frozen: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionComputeRequest {
    pub trade_date: TradeDate,
    pub stocks: Vec<StockContextWire>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionFreezeRequest {
    pub trade_date: TradeDate,
    pub candidates: Vec<TradeCandidateWire>,
}

impl From<&TradeCandidate> for TradeCandidateWire {
    fn from(c: &TradeCandidate) -> Self {
        Self {
            symbol: c.symbol.clone(),
            direction: c.direction,
            strategy_used: c.strategy_used,
            rs_value: c.rs_value,
            gap_high: c.gap_high,
            gap_low: c.gap_low,
            intraday_high: c.intraday_high,
            intraday_low: c.intraday_low,
            last_higher_low: c.last_higher_low,
            yesterday_close: c.yesterday_close,
            vwap_value: c.vwap_value,
            structure_valid: c.structure_valid,
            reason: c.reason.clone(),
        }
    }
}

impl From<TradeCandidateWire> for TradeCandidate {
    fn from(w: TradeCandidateWire) -> Self {
        Self {
            symbol: w.symbol,
            direction: w.direction,
            strategy_used: w.strategy_used,
            rs_value: w.rs_value,
            gap_high: w.gap_high,
            gap_low: w.gap_low,
            intraday_high: w.intraday_high,
            intraday_low: w.intraday_low,
            last_higher_low: w.last_higher_low,
            yesterday_close: w.yesterday_close,
            vwap_value: w.vwap_value,
            structure_valid: w.structure_valid,
            reason: w.reason,
        }
    }
}

impl From<&StockContext> for StockContextWire {
    fn from(s: &StockContext) -> Self {
        Self {
            symbol: s.symbol.clone(),
            avg_traded_value_20d: s.avg_traded_value_20d,
            atr_pct: s.atr_pct,
            abnormal_candle: s.abnormal_candle,
            stock_open_0915: s.stock_open_0915,
            stock_current_price: s.stock_current_price,
            index_open_0915: s.index_open_0915,
            index_current_price: s.index_current_price,
            gap_pct: s.gap_pct,
            gap_hold: s.gap_hold,
            price_vs_vwap: s.price_vs_vwap,
            structure_valid: s.structure_valid,
        }
    }
}

/// The wire carries a `candidatesMode` flag, but the mode the client
/// acts on is recomputed from the decoded snapshot itself.
pub fn decode_execution(w: ExecutionSnapshotWire) -> ExecutionSnapshot {
    ExecutionSnapshot {
        trade_date: w.trade_date,
        control: ExecutionControl {
            market_context: w.market_context,
            trade_permission: w.trade_permission,
            allowed_strategies: w.allowed_strategies,
            max_trades_allowed: w.max_trades_allowed,
            execution_enabled: w.execution_enabled,
        },
        candidates: w.candidates.into_iter().map(TradeCandidate::from).collect(),
        generated_at: w.generated_at,
        frozen_at: w.frozen_at,
    }
}

pub fn decode_execution_preview(w: ExecutionPreviewWire) -> ExecutionPreview {
    ExecutionPreview {
        snapshot: decode_execution(w.snapshot),
        can_freeze: w.can_freeze,
    }
}

pub fn encode_execution(s: &ExecutionSnapshot) -> ExecutionSnapshotWire {
    ExecutionSnapshotWire {
        trade_date: s.trade_date,
        market_context: s.control.market_context.clone(),
        trade_permission: s.control.trade_permission.clone(),
        allowed_strategies: s.control.allowed_strategies.clone(),
        max_trades_allowed: s.control.max_trades_allowed,
        execution_enabled: s.control.execution_enabled,
        candidates_mode: s.candidates_mode(),
        candidates: s.candidates.iter().map(TradeCandidateWire::from).collect(),
        generated_at: s.generated_at,
        frozen_at: s.frozen_at,
    }
}

/* =====================================================
   Stage 4: trade construction
===================================================== */

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintWire {
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

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionPreviewWire {
    pub mode: StageMode,
    pub candidates: Vec<BlueprintWire>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionComputeRequest {
    pub trade_date: TradeDate,
    pub symbol: String,

    pub capital: f64,
    pub risk_percent: f64,
    pub entry_buffer: f64,
    pub r_multiple: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlanWire {
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

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionComputeResponse {
    pub preview: TradePlanWire,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionFreezeRequest {
    pub trade_date: TradeDate,
    pub symbol: String,

    pub capital: f64,
    pub risk_percent: f64,
    pub entry_buffer: f64,
    pub r_multiple: f64,

    pub rationale: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenTradeWire {
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

    pub capital: f64,
    pub risk_percent: f64,
    pub entry_buffer: f64,
    pub r_multiple: f64,

    pub rationale: Option<String>,

    pub frozen_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionFrozenResponse {
    pub trade: FrozenTradeWire,
    pub frozen: bool,
}

pub fn decode_blueprint(w: BlueprintWire) -> ExecutionBlueprint {
    ExecutionBlueprint {
        trade_date: w.trade_date,
        symbol: w.symbol,
        direction: w.direction,
        strategy_used: w.strategy_used,
        gap_high: w.gap_high,
        gap_low: w.gap_low,
        intraday_high: w.intraday_high,
        intraday_low: w.intraday_low,
        last_higher_low: w.last_higher_low,
        vwap_value: w.vwap_value,
        structure_valid: w.structure_valid,
    }
}

pub fn decode_construction_preview(w: ConstructionPreviewWire) -> ConstructionPreview {
    ConstructionPreview {
        candidates: w.candidates.into_iter().map(decode_blueprint).collect(),
    }
}

pub fn decode_trade_plan(w: TradePlanWire) -> TradePlan {
    TradePlan {
        trade_date: w.trade_date,
        symbol: w.symbol,
        direction: w.direction,
        strategy_used: w.strategy_used,
        entry_price: w.entry_price,
        stop_loss: w.stop_loss,
        risk_per_share: w.risk_per_share,
        quantity: w.quantity,
        target_price: w.target_price,
        trade_status: w.trade_status,
        block_reason: w.block_reason,
        constructed_at: w.constructed_at,
    }
}

pub fn decode_frozen_trade(w: FrozenTradeWire) -> FrozenTrade {
    FrozenTrade {
        trade_date: w.trade_date,
        symbol: w.symbol,
        direction: w.direction,
        strategy_used: w.strategy_used,
        entry_price: w.entry_price,
        stop_loss: w.stop_loss,
        risk_per_share: w.risk_per_share,
        quantity: w.quantity,
        target_price: w.target_price,
        trade_status: w.trade_status,
        block_reason: w.block_reason,
        risk: RiskParams {
            capital: w.capital,
            risk_percent: w.risk_percent,
            entry_buffer: w.entry_buffer,
            r_multiple: w.r_multiple,
        },
        rationale: w.rationale,
        frozen_at: w.frozen_at,
    }
}

pub fn encode_construction_compute(
    trade_date: TradeDate,
    i: &ConstructionInputs,
) -> ConstructionComputeRequest {
    ConstructionComputeRequest {
        trade_date,
        symbol: i.symbol.clone(),
        capital: i.risk.capital,
        risk_percent: i.risk.risk_percent,
        entry_buffer: i.risk.entry_buffer,
        r_multiple: i.risk.r_multiple,
    }
}

pub fn encode_construction_freeze(
    trade_date: TradeDate,
    f: &ConstructionFreeze,
) -> ConstructionFreezeRequest {
    ConstructionFreezeRequest {
        trade_date,
        symbol: f.symbol.clone(),
        capital: f.risk.capital,
        risk_percent: f.risk.risk_percent,
        entry_buffer: f.risk.entry_buffer,
        r_multiple: f.risk.r_multiple,
        rationale: f.rationale.clone(),
    }
}
