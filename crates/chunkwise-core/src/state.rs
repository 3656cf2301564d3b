//! Run lifecycle phases and the loop state carried between host turns.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a run.
///
/// ```text
/// Validating → Slicing ⇄ Yielded → Completed
///                 │
///                 ├────────────→ Cancelled
///                 └────────────→ Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run is in progress.
    Idle,
    /// Checking the request before any work is scheduled.
    Validating,
    /// Processing a slice synchronously.
    Slicing,
    /// Suspended, waiting for the host to grant the next turn (including the first).
    Yielded,
    /// All elements processed (or short-circuited); `on_complete` has fired.
    Completed,
    /// Stopped at a slice boundary; `on_complete` has fired with the partial output.
    Cancelled,
    /// Aborted by an element error; `on_complete` will never fire.
    Errored,
}

impl RunPhase {
    /// Returns `true` once the run can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Errored)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Validating => 1,
            Self::Slicing => 2,
            Self::Yielded => 3,
            Self::Completed => 4,
            Self::Cancelled => 5,
            Self::Errored => 6,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Validating,
            2 => Self::Slicing,
            3 => Self::Yielded,
            4 => Self::Completed,
            5 => Self::Cancelled,
            6 => Self::Errored,
            _ => Self::Idle,
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::Slicing => write!(f, "slicing"),
            Self::Yielded => write!(f, "yielded"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// How a run ended, as reported by the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
    Errored,
}

impl From<RunStatus> for RunPhase {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => Self::Completed,
            RunStatus::Cancelled => Self::Cancelled,
            RunStatus::Errored => Self::Errored,
        }
    }
}

/// Loop state of one run, held between slices.
#[derive(Debug)]
pub struct RunState<O> {
    /// Index of the next unprocessed element. Never decreases.
    pub cursor: usize,
    /// Mode-specific output built so far.
    pub accumulator: O,
}

impl<O> RunState<O> {
    pub fn new(empty: O) -> Self {
        Self {
            cursor: 0,
            accumulator: empty,
        }
    }

    /// Half-open range of the next slice, clipped to `len`.
    pub fn next_slice(&self, chunk_size: usize, len: usize) -> std::ops::Range<usize> {
        let start = self.cursor.min(len);
        start..self.cursor.saturating_add(chunk_size).min(len)
    }

    /// Advance the cursor. Backwards moves are ignored.
    pub fn advance_to(&mut self, cursor: usize) {
        self.cursor = self.cursor.max(cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_u8() {
        for phase in [
            RunPhase::Idle,
            RunPhase::Validating,
            RunPhase::Slicing,
            RunPhase::Yielded,
            RunPhase::Completed,
            RunPhase::Cancelled,
            RunPhase::Errored,
        ] {
            assert_eq!(RunPhase::from_u8(phase.as_u8()), phase);
        }
    }

    #[test]
    fn terminal_phases() {
        assert!(!RunPhase::Yielded.is_terminal());
        assert!(!RunPhase::Slicing.is_terminal());
        assert!(RunPhase::Completed.is_terminal());
        assert!(RunPhase::Cancelled.is_terminal());
        assert!(RunPhase::Errored.is_terminal());
    }

    #[test]
    fn slice_is_clipped_to_length() {
        let mut state = RunState::new(Vec::<u8>::new());
        assert_eq!(state.next_slice(2, 5), 0..2);
        state.advance_to(4);
        assert_eq!(state.next_slice(2, 5), 4..5);
        state.advance_to(5);
        assert!(state.next_slice(2, 5).is_empty());
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut state = RunState::new(());
        state.advance_to(10);
        state.advance_to(4);
        assert_eq!(state.cursor, 10);
    }
}
