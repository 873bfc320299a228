use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    New,
    LoadingData,
    LoadingRoi,
    Ready,
    AnalyseShape,
    SavingRoi,
    /// Interactive adjustment in progress; left by resuming the prior state.
    ValueAdjusting,
    Discarded,
}

impl SessionState {
    pub fn is_loading(self) -> bool {
        matches!(self, Self::LoadingData | Self::LoadingRoi)
    }

    pub fn can_move_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Discarded, _) => false,
            (_, Discarded) => true,
            (New, LoadingData | LoadingRoi | Ready) => true,
            (LoadingData, LoadingRoi | Ready) => true,
            (LoadingRoi, Ready) => true,
            (Ready, LoadingData | LoadingRoi | AnalyseShape | SavingRoi | ValueAdjusting) => true,
            (AnalyseShape, Ready | SavingRoi | ValueAdjusting) => true,
            (SavingRoi, Ready | AnalyseShape) => true,
            (ValueAdjusting, Ready | AnalyseShape) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::LoadingData => "loading data",
            Self::LoadingRoi => "loading ROIs",
            Self::Ready => "ready",
            Self::AnalyseShape => "analysing shapes",
            Self::SavingRoi => "saving ROIs",
            Self::ValueAdjusting => "adjusting values",
            Self::Discarded => "discarded",
        };
        formatter.write_str(name)
    }
}

/// Current session state plus the state an interactive adjustment resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    state: SessionState,
    resume: Option<SessionState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::New,
            resume: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn resume_target(&self) -> Option<SessionState> {
        self.resume
    }

    /// Moves to `next` and returns the state that was left.
    pub fn transition(&mut self, next: SessionState) -> Result<SessionState> {
        if !self.state.can_move_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        if next == SessionState::Discarded {
            self.resume = None;
        }
        Ok(std::mem::replace(&mut self.state, next))
    }

    pub fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::IllegalState {
                operation,
                state: self.state,
            })
        }
    }

    pub fn begin_adjusting(&mut self) -> Result<SessionState> {
        self.require(
            "begin_adjusting",
            &[SessionState::Ready, SessionState::AnalyseShape],
        )?;
        let previous = self.transition(SessionState::ValueAdjusting)?;
        self.resume = Some(previous);
        Ok(previous)
    }

    /// Leaves `ValueAdjusting` for the state it interrupted.
    pub fn end_adjusting(&mut self) -> Result<SessionState> {
        self.require("end_adjusting", &[SessionState::ValueAdjusting])?;
        let target = self.resume.take().unwrap_or(SessionState::Ready);
        self.transition(target)?;
        Ok(target)
    }

    /// Marks the running analysis as finished. Returns the transition taken,
    /// if the analysis state was the current one. An analysis interrupted by
    /// an adjustment resumes into `Ready` instead.
    pub fn settle_analysis(&mut self) -> Option<(SessionState, SessionState)> {
        match self.state {
            SessionState::AnalyseShape => {
                self.state = SessionState::Ready;
                Some((SessionState::AnalyseShape, SessionState::Ready))
            }
            SessionState::ValueAdjusting if self.resume == Some(SessionState::AnalyseShape) => {
                self.resume = Some(SessionState::Ready);
                None
            }
            _ => None,
        }
    }
}
