//! The session façade: one image's ROI index, statistics cache and lifecycle.

mod context;
mod error;
mod state;
mod worker;

#[cfg(test)]
mod tests;

pub use context::Session;
pub use error::{Result, SessionError};
pub use state::{SessionState, StateMachine};
pub use worker::{StatisticsReport, Unavailable};
