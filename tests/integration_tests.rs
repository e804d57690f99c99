//! Integration tests for the trade-day workflow.
//! These drive the stage controllers and orchestrator together against
//! a mock analytics service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Notify;

use tradesetup::day::TradeDay;
use tradesetup::error::{TransportError, WorkflowError};
use tradesetup::model::common::{StageMode, TradeDate};
use tradesetup::model::construction::{
    ConstructionFreeze, ConstructionInputs, FrozenTrade, RiskParams, TradePlan, TradeStatus,
};
use tradesetup::model::context::{
    ContextBody, ContextDerived, ContextFreeze, ContextInputs, ContextSnapshot, GapContext,
    MarketBias,
};
use tradesetup::model::execution::{
    ExecutionControl, ExecutionSnapshot, PriceVsVwap, StockContext, StrategyUsed, TradeCandidate,
    TradeDirection,
};
use tradesetup::model::open_behavior::{
    OpenBehaviorBody, OpenBehaviorDerived, OpenBehaviorFreeze, OpenBehaviorInputs,
    OpenBehaviorSnapshot, RangeHoldStatus, VolatilityState, VwapState,
};
use tradesetup::stages::open_behavior::OpenBehaviorStage;
use tradesetup::stages::traits::{
    ConstructionApi, ConstructionPreview, ContextApi, ContextPreview, ExecutionApi,
    ExecutionPreview, OpenBehaviorApi, OpenBehaviorPreview, StageResult,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn derived_open_behavior() -> OpenBehaviorDerived {
    OpenBehaviorDerived {
        avg_5m_range_prev_day: 42.5,
        ir_high: 22650.0,
        ir_low: 22580.0,
        ir_range: 70.0,
        ir_ratio: 1.65,
        volatility_state: VolatilityState::Normal,
        vwap_cross_count: 2,
        vwap_state: VwapState::AboveVwap,
        range_hold_status: RangeHoldStatus::Held,
        index_open_behavior: "ORDERLY".to_string(),
        early_volatility: "LOW".to_string(),
        market_participation: "BROAD".to_string(),
        trade_allowed: true,
    }
}

fn valid_stock_context() -> StockContext {
    StockContext {
        symbol: "RELIANCE".to_string(),
        avg_traded_value_20d: 850.0,
        atr_pct: 1.8,
        abnormal_candle: false,
        stock_open_0915: 2950.0,
        stock_current_price: 2987.0,
        index_open_0915: 22600.0,
        index_current_price: 22655.0,
        gap_pct: 1.2,
        gap_hold: true,
        price_vs_vwap: PriceVsVwap::Above,
        structure_valid: true,
    }
}

fn risk() -> RiskParams {
    RiskParams {
        capital: 100000.0,
        risk_percent: 1.0,
        entry_buffer: 0.05,
        r_multiple: 2.0,
    }
}

/// Scripted analytics service. Stage-4 plans can be forced BLOCKED,
/// and stage-2 compute can be held open to simulate a slow response
/// racing a freeze.
struct ScriptedService {
    blocked_plan: AtomicBool,
    construction_freeze_calls: AtomicUsize,
    context_preview_calls: AtomicUsize,
    hold_stage2_compute: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedService {
    fn new() -> Self {
        Self {
            blocked_plan: AtomicBool::new(false),
            construction_freeze_calls: AtomicUsize::new(0),
            context_preview_calls: AtomicUsize::new(0),
            hold_stage2_compute: None,
        }
    }

    /// (entered, release): compute signals `entered`, then waits for
    /// `release` before responding.
    fn with_held_stage2_compute() -> (Self, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut svc = Self::new();
        svc.hold_stage2_compute = Some((entered.clone(), release.clone()));
        (svc, entered, release)
    }
}

#[async_trait]
impl ContextApi for ScriptedService {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ContextPreview> {
        self.context_preview_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ContextPreview {
            snapshot: ContextSnapshot::manual_draft(trade_date),
            can_freeze: true,
        })
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ContextInputs,
    ) -> StageResult<ContextPreview> {
        Ok(ContextPreview {
            snapshot: ContextSnapshot {
                trade_date,
                body: ContextBody::Automated(ContextDerived {
                    market_bias: inputs.market_bias,
                    gap_context: inputs.gap_context,
                    premarket_notes: inputs.premarket_notes.clone(),
                }),
                frozen_at: None,
            },
            can_freeze: true,
        })
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ContextFreeze,
    ) -> StageResult<ContextSnapshot> {
        Ok(ContextSnapshot {
            trade_date,
            body: ContextBody::Automated(ContextDerived {
                market_bias: finals.market_bias,
                gap_context: GapContext::GapUp,
                premarket_notes: finals.premarket_notes.clone(),
            }),
            frozen_at: Some(Utc::now()),
        })
    }
}

#[async_trait]
impl OpenBehaviorApi for ScriptedService {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<OpenBehaviorPreview> {
        Ok(OpenBehaviorPreview {
            snapshot: OpenBehaviorSnapshot::manual_draft(trade_date),
            can_freeze: true,
        })
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        _inputs: &OpenBehaviorInputs,
    ) -> StageResult<OpenBehaviorPreview> {
        if let Some((entered, release)) = &self.hold_stage2_compute {
            entered.notify_one();
            release.notified().await;
        }
        Ok(OpenBehaviorPreview {
            snapshot: OpenBehaviorSnapshot {
                trade_date,
                body: OpenBehaviorBody::Automated(derived_open_behavior()),
                frozen_at: None,
            },
            can_freeze: true,
        })
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        _finals: &OpenBehaviorFreeze,
    ) -> StageResult<OpenBehaviorSnapshot> {
        Ok(OpenBehaviorSnapshot {
            trade_date,
            body: OpenBehaviorBody::Automated(derived_open_behavior()),
            frozen_at: Some(Utc::now()),
        })
    }
}

#[async_trait]
impl ExecutionApi for ScriptedService {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ExecutionPreview> {
        Ok(ExecutionPreview {
            snapshot: ExecutionSnapshot {
                trade_date,
                control: ExecutionControl {
                    market_context: "TRENDING".to_string(),
                    trade_permission: "ALLOWED".to_string(),
                    allowed_strategies: vec!["GAP_FOLLOW".to_string(), "MOMENTUM".to_string()],
                    max_trades_allowed: 2,
                    execution_enabled: true,
                },
                candidates: Vec::new(),
                generated_at: Utc::now(),
                frozen_at: None,
            },
            can_freeze: true,
        })
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        stocks: &[StockContext],
    ) -> StageResult<ExecutionPreview> {
        let candidates = stocks
            .iter()
            .map(|s| TradeCandidate {
                symbol: s.symbol.clone(),
                direction: TradeDirection::Long,
                strategy_used: if s.structure_valid && s.gap_hold {
                    StrategyUsed::GapFollow
                } else {
                    StrategyUsed::NoTrade
                },
                rs_value: Some(1.3),
                gap_high: Some(s.stock_open_0915),
                gap_low: None,
                intraday_high: Some(s.stock_current_price),
                intraday_low: None,
                last_higher_low: None,
                yesterday_close: None,
                vwap_value: None,
                structure_valid: s.structure_valid,
                reason: "evaluated from stock context".to_string(),
            })
            .collect();

        let mut p = ExecutionApi::preview(self, trade_date).await?;
        p.snapshot.candidates = candidates;
        Ok(p)
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        candidates: &[TradeCandidate],
    ) -> StageResult<ExecutionSnapshot> {
        let mut snapshot = ExecutionApi::preview(self, trade_date).await?.snapshot;
        snapshot.candidates = candidates.to_vec();
        snapshot.frozen_at = Some(Utc::now());
        Ok(snapshot)
    }
}

#[async_trait]
impl ConstructionApi for ScriptedService {
    async fn preview(&self, _trade_date: TradeDate) -> StageResult<ConstructionPreview> {
        Ok(ConstructionPreview {
            candidates: Vec::new(),
        })
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ConstructionInputs,
    ) -> StageResult<TradePlan> {
        let blocked = self.blocked_plan.load(Ordering::SeqCst);
        Ok(TradePlan {
            trade_date,
            symbol: inputs.symbol.clone(),
            direction: TradeDirection::Long,
            strategy_used: StrategyUsed::GapFollow,
            entry_price: 2988.5,
            stop_loss: 2961.0,
            risk_per_share: 27.5,
            quantity: 36,
            target_price: 3043.5,
            trade_status: if blocked {
                TradeStatus::Blocked
            } else {
                TradeStatus::Ready
            },
            block_reason: if blocked {
                Some("risk per share exceeds budget".to_string())
            } else {
                None
            },
            constructed_at: Utc::now(),
        })
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ConstructionFreeze,
    ) -> StageResult<FrozenTrade> {
        self.construction_freeze_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FrozenTrade {
            trade_date,
            symbol: finals.symbol.clone(),
            direction: TradeDirection::Long,
            strategy_used: StrategyUsed::GapFollow,
            entry_price: 2988.5,
            stop_loss: 2961.0,
            risk_per_share: 27.5,
            quantity: 36,
            target_price: 3043.5,
            trade_status: TradeStatus::Ready,
            block_reason: None,
            risk: finals.risk,
            rationale: finals.rationale.clone(),
            frozen_at: Utc::now(),
        })
    }
}

fn context_freeze() -> ContextFreeze {
    ContextFreeze {
        market_bias: MarketBias::Bullish,
        premarket_notes: Some("strong global cues".to_string()),
    }
}

fn open_behavior_freeze() -> OpenBehaviorFreeze {
    OpenBehaviorFreeze {
        candles: Vec::new(),
        avg_5m_range_prev_day: 42.5,
        reason: None,
    }
}

/// Scenario B: manual stage-3 funnel produces exactly one candidate
/// and freezing persists it.
#[tokio::test]
async fn test_stage3_manual_funnel_to_frozen_candidates() {
    let day = TradeDay::new(Arc::new(ScriptedService::new()), date());

    let snapshot = day.execution.preview(date()).await.unwrap();
    assert_eq!(snapshot.candidates_mode(), StageMode::ManualInput);
    assert!(snapshot.candidates.is_empty());
    assert!(day.execution.can_freeze());

    let computed = day
        .execution
        .compute(date(), &[valid_stock_context()])
        .await
        .unwrap();
    assert_eq!(computed.candidates.len(), 1);
    let candidate = &computed.candidates[0];
    assert!(matches!(
        candidate.strategy_used,
        StrategyUsed::GapFollow | StrategyUsed::Momentum | StrategyUsed::NoTrade
    ));
    // Structural evidence rides along with the candidate
    assert_eq!(candidate.gap_high, Some(2950.0));
    assert!(candidate.structure_valid);

    let frozen = day
        .execution
        .freeze(date(), &computed.candidates)
        .await
        .unwrap();
    assert!(frozen.is_frozen());
    assert_eq!(frozen.candidates_mode(), StageMode::Automated);
    assert!(day.execution.candidates_persisted());
    // The frozen snapshot keeps the candidate's evidence
    assert_eq!(frozen.candidates[0].gap_high, Some(2950.0));
}

/// Scenario C: a BLOCKED plan must keep freeze unreachable.
#[tokio::test]
async fn test_blocked_plan_prevents_trade_freeze() {
    let service = Arc::new(ScriptedService::new());
    service.blocked_plan.store(true, Ordering::SeqCst);
    let day = TradeDay::new(service.clone(), date());

    let inputs = ConstructionInputs {
        symbol: "RELIANCE".to_string(),
        risk: risk(),
    };
    let plan = day.construction.compute(date(), &inputs).await.unwrap();
    assert_eq!(plan.trade_status, TradeStatus::Blocked);

    let err = day
        .construction
        .freeze(
            date(),
            &ConstructionFreeze {
                symbol: "RELIANCE".to_string(),
                risk: risk(),
                rationale: None,
            },
        )
        .await
        .unwrap_err();

    match err {
        WorkflowError::Validation { message } => {
            assert!(message.contains("risk per share"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    // Rejected client-side: the service never saw a freeze call
    assert_eq!(service.construction_freeze_calls.load(Ordering::SeqCst), 0);
    assert!(!day.construction.is_frozen());
}

/// Scenario D: a stage-2 compute response that lands after the freeze
/// must be discarded; the frozen snapshot stays untouched.
#[tokio::test]
async fn test_late_compute_response_discarded_after_freeze() {
    let (service, entered, release) = ScriptedService::with_held_stage2_compute();
    let service = Arc::new(service);
    let stage = Arc::new(OpenBehaviorStage::new(service));

    let compute_handle = {
        let stage = stage.clone();
        tokio::spawn(async move {
            stage
                .compute(
                    date(),
                    &OpenBehaviorInputs {
                        candles: Vec::new(),
                        avg_5m_range_prev_day: 42.5,
                    },
                )
                .await
        })
    };

    // Wait until the compute call is in flight, then freeze past it
    entered.notified().await;
    let frozen = stage.freeze(date(), &open_behavior_freeze()).await.unwrap();
    assert!(frozen.is_frozen());

    release.notify_one();
    // The late compute settles on the store's frozen snapshot, not
    // its own discarded draft
    let returned = compute_handle.await.unwrap().unwrap();
    assert!(returned.is_frozen());

    let held = stage.snapshot().unwrap();
    assert!(held.is_frozen());
    assert!(stage.is_frozen());
}

#[tokio::test]
async fn test_full_day_happy_path() {
    let day = TradeDay::new(Arc::new(ScriptedService::new()), date());

    day.refresh().await;
    assert!(!day.gates().can_access_stage2);

    day.context.freeze(date(), &context_freeze()).await.unwrap();
    day.refresh().await;
    assert!(day.gates().can_access_stage2);

    day.open_behavior
        .freeze(date(), &open_behavior_freeze())
        .await
        .unwrap();
    day.refresh().await;
    assert!(day.gates().can_access_stage3);

    let computed = day
        .execution
        .compute(date(), &[valid_stock_context()])
        .await
        .unwrap();
    day.execution
        .freeze(date(), &computed.candidates)
        .await
        .unwrap();
    assert!(day.gates().can_access_stage4);

    let inputs = ConstructionInputs {
        symbol: "RELIANCE".to_string(),
        risk: risk(),
    };
    let plan = day.construction.compute(date(), &inputs).await.unwrap();
    assert_eq!(plan.trade_status, TradeStatus::Ready);

    let trade = day
        .construction
        .freeze(
            date(),
            &ConstructionFreeze {
                symbol: "RELIANCE".to_string(),
                risk: risk(),
                rationale: Some("best RS candidate of the day".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(trade.symbol, "RELIANCE");
    assert_eq!(trade.trade_status, TradeStatus::Ready);

    // Completed decision closes stage 4
    assert!(!day.gates().can_access_stage4);
    assert!(day.construction.frozen_trade().is_some());
}

#[tokio::test]
async fn test_preview_is_idempotent_on_frozen_stage() {
    let service = Arc::new(ScriptedService::new());
    let day = TradeDay::new(service.clone(), date());

    let frozen = day.context.freeze(date(), &context_freeze()).await.unwrap();
    let calls_after_freeze = service.context_preview_calls.load(Ordering::SeqCst);

    let first = day.context.preview(date()).await.unwrap();
    let second = day.context.preview(date()).await.unwrap();
    assert_eq!(first, frozen);
    assert_eq!(second, frozen);

    // No network call is made for a frozen stage
    assert_eq!(
        service.context_preview_calls.load(Ordering::SeqCst),
        calls_after_freeze
    );
}

#[tokio::test]
async fn test_double_freeze_rejected() {
    let day = TradeDay::new(Arc::new(ScriptedService::new()), date());

    day.context.freeze(date(), &context_freeze()).await.unwrap();
    let err = day
        .context
        .freeze(date(), &context_freeze())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyFrozen { .. }));
}

#[tokio::test]
async fn test_compute_rejected_after_freeze() {
    let day = TradeDay::new(Arc::new(ScriptedService::new()), date());

    day.open_behavior
        .freeze(date(), &open_behavior_freeze())
        .await
        .unwrap();

    let err = day
        .open_behavior
        .compute(
            date(),
            &OpenBehaviorInputs {
                candles: Vec::new(),
                avg_5m_range_prev_day: 42.5,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyFrozen { .. }));
}

#[tokio::test]
async fn test_transport_error_is_typed() {
    let err = TransportError::Http {
        status: 503,
        body: "upstream down".to_string(),
    };
    let wrapped = WorkflowError::from(err);
    assert!(wrapped.is_retryable());
    assert!(wrapped.to_string().contains("503"));
}
