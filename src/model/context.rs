//! Stage 1: pre-market context.
//!
//! Captures the trader's market understanding before the open.
//! Frozen once and referenced for the rest of the trading day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{StageMode, TradeDate};

/// High-level directional bias for the day. Not a trade signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
    RangeBound,
    Undefined,
}

/// Opening gap behavior of the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapContext {
    GapUp,
    GapDown,
    Flat,
    Unknown,
}

/// Service-derived context, complete by construction.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextDerived {
    pub market_bias: MarketBias,
    pub gap_context: GapContext,
    pub premarket_notes: Option<String>,
}

/// Trader-editable draft while automation has nothing usable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextDraft {
    pub market_bias: Option<MarketBias>,
    pub gap_context: Option<GapContext>,
    pub premarket_notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContextBody {
    Automated(ContextDerived),
    Manual(ContextDraft),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextSnapshot {
    pub trade_date: TradeDate,
    pub body: ContextBody,
    pub frozen_at: Option<DateTime<Utc>>,
}

impl ContextSnapshot {
    /// Empty manual draft, used when preview fails or returns nothing.
    pub fn manual_draft(trade_date: TradeDate) -> Self {
        Self {
            trade_date,
            body: ContextBody::Manual(ContextDraft::default()),
            frozen_at: None,
        }
    }

    pub fn mode(&self) -> StageMode {
        match &self.body {
            ContextBody::Automated(_) => StageMode::Automated,
            ContextBody::Manual(_) => StageMode::ManualInput,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }
}

/// Classify raw context fields. Automated requires both classifications
/// present and neither at its sentinel value. Total and deterministic.
pub fn resolve_context_mode(bias: Option<MarketBias>, gap: Option<GapContext>) -> StageMode {
    match (bias, gap) {
        (Some(b), Some(g)) if b != MarketBias::Undefined && g != GapContext::Unknown => {
            StageMode::Automated
        }
        _ => StageMode::ManualInput,
    }
}

impl ContextDraft {
    /// Promote to the Automated variant when the derived fields are
    /// complete, otherwise stay a manual draft.
    pub fn into_body(self) -> ContextBody {
        match resolve_context_mode(self.market_bias, self.gap_context) {
            StageMode::Automated => ContextBody::Automated(ContextDerived {
                market_bias: self.market_bias.unwrap_or(MarketBias::Undefined),
                gap_context: self.gap_context.unwrap_or(GapContext::Unknown),
                premarket_notes: self.premarket_notes,
            }),
            StageMode::ManualInput => ContextBody::Manual(self),
        }
    }
}

/// Trader inputs submitted to stage-1 compute.
#[derive(Clone, Debug)]
pub struct ContextInputs {
    pub market_bias: MarketBias,
    pub gap_context: GapContext,
    pub premarket_notes: Option<String>,
}

/// Final fields submitted to stage-1 freeze.
#[derive(Clone, Debug)]
pub struct ContextFreeze {
    pub market_bias: MarketBias,
    pub premarket_notes: Option<String>,
}
