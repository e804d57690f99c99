pub mod common;
pub mod construction;
pub mod context;
pub mod execution;
pub mod open_behavior;
