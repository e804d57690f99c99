//! Custom error types for the workflow orchestration layer
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use thiserror::Error;

use crate::model::common::{Stage, TradeDate};

/// Transport-level failures, normalized by the API client.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Top-level workflow errors returned by stage controllers.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The external service rejected compute/freeze inputs.
    /// Retryable after the trader corrects them.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// An operation hit a stage whose snapshot is already immutable.
    /// This signals a gating bug upstream, not a retry case.
    #[error("{stage} already frozen for {trade_date}")]
    AlreadyFrozen { stage: Stage, trade_date: TradeDate },

    /// A raw `set` was attempted on a frozen snapshot store.
    #[error("Snapshot store for {stage} is frozen")]
    FrozenSnapshot { stage: Stage },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WorkflowError {
    /// Classify a transport failure from a compute/freeze call.
    /// 400/422 means the service rejected the inputs themselves.
    pub fn from_rejection(err: TransportError) -> Self {
        match err {
            TransportError::Http { status, body } if status == 400 || status == 422 => {
                WorkflowError::Validation { message: body }
            }
            other => WorkflowError::Transport(other),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Transport(_) | WorkflowError::Validation { .. }
        )
    }
}
