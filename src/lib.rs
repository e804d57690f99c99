//! TradeSetup - client-side orchestration for a four-stage daily
//! trading-decision workflow.
//!
//! Each stage follows a preview → compute → freeze protocol against an
//! external analytics service; this crate owns the snapshot lifecycle,
//! mode resolution, stale-response discarding, and the day-level gates
//! that unlock later stages.

pub mod config;
pub mod day;
pub mod error;
pub mod model;
pub mod stages;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use day::{DayGates, TradeDay};
pub use error::{TransportError, WorkflowError};
pub use model::common::{Stage, StageMode, TradeDate};
