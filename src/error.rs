use std::fmt;

/// Timer-queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The handle's timer already fired, was canceled, or its slot has
    /// been reused by a newer timer
    StaleHandle,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::StaleHandle => write!(f, "Stale timer handle"),
        }
    }
}

impl std::error::Error for TimerError {}

pub type TimerResult<T> = Result<T, TimerError>;
