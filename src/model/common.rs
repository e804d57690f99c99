use serde::{Deserialize, Serialize};

/// Calendar-date key identifying one workflow instance.
pub type TradeDate = chrono::NaiveDate;

/// The four sequential phases of the daily workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Context,
    OpenBehavior,
    ExecutionControl,
    TradeConstruction,
}

impl Stage {
    /// Wire path segment for this stage's endpoints.
    pub fn path(&self) -> &'static str {
        match self {
            Stage::Context => "stage1",
            Stage::OpenBehavior => "stage2",
            Stage::ExecutionControl => "stage3",
            Stage::TradeConstruction => "stage4",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Context => "STAGE-1 (pre-market context)",
            Stage::OpenBehavior => "STAGE-2 (open behavior)",
            Stage::ExecutionControl => "STAGE-3 (execution control)",
            Stage::TradeConstruction => "STAGE-4 (trade construction)",
        };
        write!(f, "{}", name)
    }
}

/// How a stage's snapshot was produced.
///
/// Automated: the service supplied every derived field.
/// ManualInput: values are missing or placeholder; the trader
/// must supply them before compute/freeze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageMode {
    Automated,
    ManualInput,
}
