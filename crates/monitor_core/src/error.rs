use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("event bus '{0}' already has a subscriber")]
    AlreadySubscribed(&'static str),
}

/// Why a single event-processing cycle did not complete.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("repository call failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("cycle exceeded {0:?}")]
    TimedOut(Duration),
    #[error("'{event}' is not allowed while the state is '{state}'")]
    IllegalTransition {
        event: &'static str,
        state: &'static str,
    },
    #[error("row {index} selected but only {rows} rows are loaded")]
    RowOutOfRange { index: usize, rows: usize },
}

impl CycleError {
    /// Programming errors on the caller's side, as opposed to I/O trouble.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            CycleError::IllegalTransition { .. } | CycleError::RowOutOfRange { .. }
        )
    }
}
