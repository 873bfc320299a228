use thiserror::Error;

use crate::index::IndexError;
use crate::persistence::PersistError;
use crate::stats::RequestId;

use super::SessionState;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{operation} is not allowed while the session is {state}")]
    IllegalState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("session cannot move from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("ROI edit rejected: {0}")]
    Index(#[from] IndexError),

    #[error("ROI records rejected: {0}")]
    Persist(#[from] PersistError),

    #[error("statistics worker could not start: {0}")]
    Worker(String),

    #[error("{0} did not complete in time")]
    Timeout(RequestId),

    #[error("no statistics request is outstanding")]
    NoRequest,
}

impl SessionError {
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState { .. })
    }
}
