//! HTTP client for the external analytics service.
//!
//! Normalizes every failure into a typed [`TransportError`] and keeps
//! all wire-format translation behind the stage API traits. Retry is a
//! transport concern only: previews are idempotent and get a bounded
//! retry; compute/freeze are submitted exactly once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::TransportError;
use crate::model::common::{Stage, TradeDate};
use crate::model::construction::{ConstructionFreeze, ConstructionInputs, FrozenTrade, TradePlan};
use crate::model::context::{ContextFreeze, ContextInputs, ContextSnapshot};
use crate::model::execution::{ExecutionSnapshot, StockContext, TradeCandidate};
use crate::model::open_behavior::{OpenBehaviorFreeze, OpenBehaviorInputs, OpenBehaviorSnapshot};
use crate::stages::traits::{
    ConstructionApi, ConstructionPreview, ContextApi, ContextPreview, ExecutionApi,
    ExecutionPreview, OpenBehaviorApi, OpenBehaviorPreview, StageResult,
};

use super::wire;

pub struct ApiClient {
    http: Client,
    base_url: String,
    preview_retries: u32,
}

impl ApiClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        if !config.base_url.starts_with("http") {
            return Err(TransportError::InvalidBaseUrl(config.base_url.clone()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            preview_retries: config.preview_retries,
        })
    }

    async fn post<Req, Resp>(&self, stage: Stage, op: &str, body: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}/{}", self.base_url, stage.path(), op);
        let resp = self
            .http
            .post(&url)
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let parsed = serde_json::from_str(&text)?;
        Ok(parsed)
    }

    /// Bounded retry for idempotent preview calls. Correctness never
    /// depends on this; it only papers over transient blips.
    async fn post_preview<Req, Resp>(
        &self,
        stage: Stage,
        body: &Req,
    ) -> Result<Resp, TransportError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.post(stage, "preview", body).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < self.preview_retries && is_transient(&e) => {
                    attempt += 1;
                    warn!(
                        "[API] {} preview attempt {} failed, retrying: {}",
                        stage, attempt, e
                    );
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &TransportError) -> bool {
    match err {
        TransportError::Network(_) => true,
        TransportError::Http { status, .. } => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl ContextApi for ApiClient {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ContextPreview> {
        let resp: wire::ContextPreviewWire = self
            .post_preview(Stage::Context, &wire::DateRequest { trade_date })
            .await?;
        debug!("[API] stage1 preview ok (can_freeze={})", resp.can_freeze);
        Ok(wire::decode_context_preview(trade_date, resp))
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ContextInputs,
    ) -> StageResult<ContextPreview> {
        let req = wire::encode_context_compute(trade_date, inputs);
        let resp: wire::ContextPreviewWire = self.post(Stage::Context, "compute", &req).await?;
        Ok(wire::decode_context_preview(trade_date, resp))
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ContextFreeze,
    ) -> StageResult<ContextSnapshot> {
        let req = wire::encode_context_freeze(trade_date, finals);
        let resp: wire::ContextFrozenWire = self.post(Stage::Context, "freeze", &req).await?;
        Ok(wire::decode_context(resp.snapshot))
    }
}

#[async_trait]
impl OpenBehaviorApi for ApiClient {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<OpenBehaviorPreview> {
        let resp: wire::OpenBehaviorPreviewWire = self
            .post_preview(Stage::OpenBehavior, &wire::DateRequest { trade_date })
            .await?;
        Ok(wire::decode_open_behavior_preview(trade_date, resp))
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &OpenBehaviorInputs,
    ) -> StageResult<OpenBehaviorPreview> {
        let req = wire::encode_open_behavior_compute(trade_date, inputs);
        let resp: wire::OpenBehaviorPreviewWire =
            self.post(Stage::OpenBehavior, "compute", &req).await?;
        Ok(wire::decode_open_behavior_preview(trade_date, resp))
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &OpenBehaviorFreeze,
    ) -> StageResult<OpenBehaviorSnapshot> {
        let req = wire::encode_open_behavior_freeze(trade_date, finals);
        let resp: wire::OpenBehaviorFrozenWire =
            self.post(Stage::OpenBehavior, "freeze", &req).await?;
        Ok(wire::decode_open_behavior(resp.snapshot))
    }
}

#[async_trait]
impl ExecutionApi for ApiClient {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ExecutionPreview> {
        let resp: wire::ExecutionPreviewWire = self
            .post_preview(Stage::ExecutionControl, &wire::DateRequest { trade_date })
            .await?;
        Ok(wire::decode_execution_preview(resp))
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        stocks: &[StockContext],
    ) -> StageResult<ExecutionPreview> {
        let req = wire::ExecutionComputeRequest {
            trade_date,
            stocks: stocks.iter().map(wire::StockContextWire::from).collect(),
        };
        let resp: wire::ExecutionPreviewWire =
            self.post(Stage::ExecutionControl, "compute", &req).await?;
        Ok(wire::decode_execution_preview(resp))
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        candidates: &[TradeCandidate],
    ) -> StageResult<ExecutionSnapshot> {
        let req = wire::ExecutionFreezeRequest {
            trade_date,
            candidates: candidates
                .iter()
                .map(wire::TradeCandidateWire::from)
                .collect(),
        };
        let resp: wire::ExecutionFrozenWire =
            self.post(Stage::ExecutionControl, "freeze", &req).await?;
        Ok(wire::decode_execution(resp.snapshot))
    }
}

#[async_trait]
impl ConstructionApi for ApiClient {
    async fn preview(&self, trade_date: TradeDate) -> StageResult<ConstructionPreview> {
        let resp: wire::ConstructionPreviewWire = self
            .post_preview(Stage::TradeConstruction, &wire::DateRequest { trade_date })
            .await?;
        Ok(wire::decode_construction_preview(resp))
    }

    async fn compute(
        &self,
        trade_date: TradeDate,
        inputs: &ConstructionInputs,
    ) -> StageResult<TradePlan> {
        let req = wire::encode_construction_compute(trade_date, inputs);
        let resp: wire::ConstructionComputeResponse =
            self.post(Stage::TradeConstruction, "compute", &req).await?;
        Ok(wire::decode_trade_plan(resp.preview))
    }

    async fn freeze(
        &self,
        trade_date: TradeDate,
        finals: &ConstructionFreeze,
    ) -> StageResult<FrozenTrade> {
        let req = wire::encode_construction_freeze(trade_date, finals);
        let resp: wire::ConstructionFrozenResponse =
            self.post(Stage::TradeConstruction, "freeze", &req).await?;
        Ok(wire::decode_frozen_trade(resp.trade))
    }
}
