//! Per-stage snapshot store.
//!
//! Holds the current snapshot and freeze status for exactly one stage.
//! Two invariants live here:
//!
//! 1. Freeze-once: after `apply_frozen` succeeds, every later write is
//!    rejected. Freeze is a one-way transition within a trade date.
//! 2. Staleness: draft writes carry a request sequence number issued by
//!    `begin_request`; a response is applied only if it is the latest
//!    issued and the store is not frozen. Late responses are dropped
//!    silently (logged, never surfaced).

use std::sync::Mutex;

use tracing::debug;

use crate::error::WorkflowError;
use crate::model::common::{Stage, TradeDate};

pub struct SnapshotStore<S> {
    stage: Stage,
    inner: Mutex<Inner<S>>,
}

struct Inner<S> {
    snapshot: Option<S>,
    frozen: bool,
    latest_seq: u64,
}

impl<S: Clone> SnapshotStore<S> {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            inner: Mutex::new(Inner {
                snapshot: None,
                frozen: false,
                latest_seq: 0,
            }),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn get(&self) -> Option<S> {
        self.inner.lock().unwrap().snapshot.clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.lock().unwrap().frozen
    }

    /// Issue a sequence number for an outgoing request. Later numbers
    /// supersede earlier ones for draft application.
    pub fn begin_request(&self) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.latest_seq += 1;
        inner.latest_seq
    }

    /// Apply a draft response. Returns false (and drops the snapshot)
    /// when the store is frozen or the sequence number is stale.
    pub fn apply(&self, seq: u64, snapshot: S) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.frozen {
            debug!("[STORE] {}: discarding response after freeze", self.stage);
            return false;
        }
        if seq != inner.latest_seq {
            debug!(
                "[STORE] {}: discarding stale response (seq {} < {})",
                self.stage, seq, inner.latest_seq
            );
            return false;
        }
        inner.snapshot = Some(snapshot);
        true
    }

    /// Apply a freeze response and close the store. A second freeze is
    /// rejected and leaves the held snapshot untouched.
    pub fn apply_frozen(&self, trade_date: TradeDate, snapshot: S) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.frozen {
            return Err(WorkflowError::AlreadyFrozen {
                stage: self.stage,
                trade_date,
            });
        }
        inner.snapshot = Some(snapshot);
        inner.frozen = true;
        Ok(())
    }

    /// Replace the snapshot wholesale, bypassing sequencing. Still
    /// rejected once frozen. No partial merging: callers assemble the
    /// full snapshot themselves.
    pub fn set(&self, snapshot: S) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.frozen {
            return Err(WorkflowError::FrozenSnapshot { stage: self.stage });
        }
        inner.snapshot = Some(snapshot);
        Ok(())
    }
}
