pub mod construction;
pub mod context;
pub mod execution;
pub mod open_behavior;
pub mod traits;
