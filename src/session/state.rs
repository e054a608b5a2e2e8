//! Session state machine and shared status snapshot.
//!
//! [`SessionState`] owns the phase (`Idle` / `Active { step }`) and applies
//! the transition table.  [`SessionStatus`] is the finer-grained display
//! flag.  [`SessionSnapshot`] is what a UI reads, through [`SharedSnapshot`].

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::interpreter::END_OF_SESSION;

// ---------------------------------------------------------------------------
// SessionPhase / Transition
// ---------------------------------------------------------------------------

/// Where the walkthrough is.
///
/// ```text
/// Idle ──Start──▶ Active{0}
/// Active{n} ──Navigate(m), 0 <= m < len──▶ Active{m}
/// Active{n} ──Navigate(m), m out of range──▶ Active{n}
/// Active{n} ──Navigate(-1)──▶ Idle
/// any ──End──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Active {
        step: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    /// Interpreter-proposed step; validated before it is adopted.
    Navigate(i64),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("session is already active")]
    AlreadyActive,
    #[error("session is not active")]
    NotActive,
}

/// Validated meaning of an interpreter `nextStep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget {
    Finish,
    Goto(usize),
    /// Out of range; the current step is kept.
    Invalid,
}

/// Validate `next` against a recipe of `len` steps.
///
/// ```
/// use savora_cook::session::{resolve_step, StepTarget};
///
/// assert_eq!(resolve_step(-1, 3), StepTarget::Finish);
/// assert_eq!(resolve_step(2, 3), StepTarget::Goto(2));
/// assert_eq!(resolve_step(99, 3), StepTarget::Invalid);
/// ```
pub fn resolve_step(next: i64, len: usize) -> StepTarget {
    if next == END_OF_SESSION {
        return StepTarget::Finish;
    }
    match usize::try_from(next) {
        Ok(step) if step < len => StepTarget::Goto(step),
        _ => StepTarget::Invalid,
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Phase of one session over a recipe with a fixed number of steps.
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: SessionPhase,
    step_count: usize,
}

impl SessionState {
    pub fn new(step_count: usize) -> Self {
        Self {
            phase: SessionPhase::Idle,
            step_count,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Active { .. })
    }

    /// Current step; `0` while idle.
    pub fn current_step(&self) -> usize {
        match self.phase {
            SessionPhase::Active { step } => step,
            SessionPhase::Idle => 0,
        }
    }

    /// Apply `transition` and return the new phase.  Rejected transitions
    /// leave the phase untouched.
    pub fn apply(&mut self, transition: Transition) -> Result<SessionPhase, TransitionError> {
        let next = match (self.phase, transition) {
            (SessionPhase::Idle, Transition::Start) => SessionPhase::Active { step: 0 },
            (SessionPhase::Active { .. }, Transition::Start) => {
                return Err(TransitionError::AlreadyActive)
            }
            (SessionPhase::Idle, Transition::Navigate(_)) => {
                return Err(TransitionError::NotActive)
            }
            (SessionPhase::Active { step }, Transition::Navigate(next)) => {
                match resolve_step(next, self.step_count) {
                    StepTarget::Finish => SessionPhase::Idle,
                    StepTarget::Goto(target) => SessionPhase::Active { step: target },
                    StepTarget::Invalid => SessionPhase::Active { step },
                }
            }
            (_, Transition::End) => SessionPhase::Idle,
        };
        self.phase = next;
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Display flag shown next to the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session running.
    #[default]
    Idle,
    /// A listening cycle is open.
    Listening,
    /// An interpreter call is outstanding.
    Thinking,
    /// A reply is being read aloud.
    Speaking,
    /// Active and waiting for the user to push-to-talk or type.
    ReadyForCommand,
}

impl SessionStatus {
    /// `true` while the session cannot take a new utterance right away.
    ///
    /// ```
    /// use savora_cook::session::SessionStatus;
    ///
    /// assert!(SessionStatus::Thinking.is_busy());
    /// assert!(!SessionStatus::Listening.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Thinking | SessionStatus::Speaking)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Listening => "Listening",
            SessionStatus::Thinking => "Thinking",
            SessionStatus::Speaking => "Speaking",
            SessionStatus::ReadyForCommand => "Ready",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of the session for a UI layer.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub active: bool,
    /// Meaningful only while `active`.
    pub step: usize,
    pub status: SessionStatus,
    pub last_query: Option<String>,
    pub last_response: Option<String>,
    /// Partial transcript of the open listening cycle.
    pub interim_transcript: Option<String>,
    /// Non-fatal problem to show to the user; cleared on the next success.
    pub warning: Option<String>,
}

/// Thread-safe handle to [`SessionSnapshot`].
///
/// Lock for a short critical section; never hold the lock across `.await`.
pub type SharedSnapshot = Arc<Mutex<SessionSnapshot>>;

pub fn new_shared_snapshot() -> SharedSnapshot {
    Arc::new(Mutex::new(SessionSnapshot::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_from_idle_enters_step_zero() {
        let mut state = SessionState::new(3);
        assert_eq!(
            state.apply(Transition::Start),
            Ok(SessionPhase::Active { step: 0 })
        );
        assert!(state.is_active());
    }

    #[test]
    fn second_start_is_rejected_without_change() {
        let mut state = SessionState::new(3);
        state.apply(Transition::Start).unwrap();
        state.apply(Transition::Navigate(2)).unwrap();

        assert_eq!(
            state.apply(Transition::Start),
            Err(TransitionError::AlreadyActive)
        );
        assert_eq!(state.current_step(), 2);
    }

    #[test]
    fn navigate_while_idle_is_rejected() {
        let mut state = SessionState::new(3);
        assert_eq!(
            state.apply(Transition::Navigate(1)),
            Err(TransitionError::NotActive)
        );
        assert_eq!(state.phase(), SessionPhase::Idle);
    }

    #[test]
    fn out_of_range_navigation_keeps_step() {
        let mut state = SessionState::new(3);
        state.apply(Transition::Start).unwrap();
        state.apply(Transition::Navigate(1)).unwrap();

        for bad in [3, 99, -2, i64::MIN, i64::MAX] {
            assert_eq!(
                state.apply(Transition::Navigate(bad)),
                Ok(SessionPhase::Active { step: 1 }),
                "nextStep {bad}"
            );
        }
    }

    #[test]
    fn finish_and_end_return_to_idle_at_step_zero() {
        let mut state = SessionState::new(3);
        state.apply(Transition::Start).unwrap();
        state.apply(Transition::Navigate(2)).unwrap();
        state.apply(Transition::Navigate(-1)).unwrap();
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert_eq!(state.current_step(), 0);

        state.apply(Transition::Start).unwrap();
        state.apply(Transition::Navigate(1)).unwrap();
        state.apply(Transition::End).unwrap();
        assert!(!state.is_active());
        assert_eq!(state.current_step(), 0);

        // End is always legal.
        assert_eq!(state.apply(Transition::End), Ok(SessionPhase::Idle));
    }

    #[test]
    fn any_navigation_sequence_stays_in_bounds() {
        let mut state = SessionState::new(3);
        state.apply(Transition::Start).unwrap();
        let proposals = [1, 2, 3, 2, 1, 0, -5, 7, 2, 1, 0, 0, 4];
        for next in proposals {
            state.apply(Transition::Navigate(next)).unwrap();
            assert!(state.is_active());
            assert!(state.current_step() < 3);
        }
    }

    #[test]
    fn status_labels() {
        assert_eq!(SessionStatus::Idle.label(), "Idle");
        assert_eq!(SessionStatus::Listening.label(), "Listening");
        assert_eq!(SessionStatus::Thinking.label(), "Thinking");
        assert_eq!(SessionStatus::Speaking.label(), "Speaking");
        assert_eq!(SessionStatus::ReadyForCommand.label(), "Ready");
    }

    #[test]
    fn status_busy() {
        assert!(!SessionStatus::Idle.is_busy());
        assert!(!SessionStatus::ReadyForCommand.is_busy());
        assert!(SessionStatus::Speaking.is_busy());
    }

    #[test]
    fn shared_snapshot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSnapshot>();
    }

    #[test]
    fn shared_snapshot_can_be_cloned_and_mutated() {
        let snapshot = new_shared_snapshot();
        let other = Arc::clone(&snapshot);

        snapshot.lock().unwrap().status = SessionStatus::Listening;
        assert_eq!(other.lock().unwrap().status, SessionStatus::Listening);
    }
}
