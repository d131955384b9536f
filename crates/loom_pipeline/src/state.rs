//! The pipeline's scheduling state machine.
//!
//! ```text
//!          trigger            timer / compile_now
//!   Idle ----------> Debouncing -----------------> Compiling
//!    ^                   ^                             |
//!    |                   +---- finish (pending) -------+
//!    +------------------------ finish -----------------+
//! ```
//!
//! A trigger while `Compiling` only sets `pending_recompile`, so any number of
//! triggers during one compile yield exactly one follow-up.

use serde::Serialize;

/// Where the pipeline is in its cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing scheduled.
    #[default]
    Idle,
    /// Waiting for the debounce period to elapse.
    Debouncing,
    /// A compile is in flight.
    Compiling,
}

/// What the caller must do after a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// (Re)arm the debounce timer.
    Debounce,
    /// A compile is in flight; the follow-up is recorded as pending.
    Deferred,
}

/// Scheduling state plus the single pending-recompile flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    state: PipelineState,
    pending_recompile: bool,
}

impl Schedule {
    /// Creates an idle schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether a follow-up compile is owed once the current one finishes.
    pub fn pending_recompile(&self) -> bool {
        self.pending_recompile
    }

    /// Records a change.
    pub fn trigger(&mut self) -> Trigger {
        match self.state {
            PipelineState::Idle | PipelineState::Debouncing => {
                self.state = PipelineState::Debouncing;
                Trigger::Debounce
            }
            PipelineState::Compiling => {
                self.pending_recompile = true;
                Trigger::Deferred
            }
        }
    }

    /// Enters `Compiling`. Returns `false` if a compile is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.state == PipelineState::Compiling {
            return false;
        }
        self.state = PipelineState::Compiling;
        true
    }

    /// Abandons a compile that was due but had nothing to compile.
    pub fn skip(&mut self) {
        if self.state == PipelineState::Debouncing {
            self.state = PipelineState::Idle;
        }
    }

    /// Leaves `Compiling`. Returns `true` if a follow-up is owed, in which
    /// case the schedule is back in `Debouncing` with the flag cleared.
    pub fn finish(&mut self) -> bool {
        if self.state != PipelineState::Compiling {
            return false;
        }
        if std::mem::take(&mut self.pending_recompile) {
            self.state = PipelineState::Debouncing;
            true
        } else {
            self.state = PipelineState::Idle;
            false
        }
    }

    /// Drops any scheduled work that has not started. An in-flight compile
    /// stays `Compiling` but will not be followed up.
    pub fn cancel(&mut self) {
        self.pending_recompile = false;
        if self.state == PipelineState::Debouncing {
            self.state = PipelineState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let schedule = Schedule::new();
        assert_eq!(schedule.state(), PipelineState::Idle);
        assert!(!schedule.pending_recompile());
    }

    #[test]
    fn trigger_debounces_then_compiles() {
        let mut schedule = Schedule::new();
        assert_eq!(schedule.trigger(), Trigger::Debounce);
        assert_eq!(schedule.trigger(), Trigger::Debounce);
        assert_eq!(schedule.state(), PipelineState::Debouncing);
        assert!(schedule.begin());
        assert_eq!(schedule.state(), PipelineState::Compiling);
        assert!(!schedule.finish());
        assert_eq!(schedule.state(), PipelineState::Idle);
    }

    #[test]
    fn many_triggers_during_compile_yield_one_follow_up() {
        let mut schedule = Schedule::new();
        schedule.trigger();
        schedule.begin();
        for _ in 0..5 {
            assert_eq!(schedule.trigger(), Trigger::Deferred);
        }
        assert!(schedule.finish());
        assert_eq!(schedule.state(), PipelineState::Debouncing);
        assert!(!schedule.pending_recompile());

        schedule.begin();
        assert!(!schedule.finish());
        assert_eq!(schedule.state(), PipelineState::Idle);
    }

    #[test]
    fn begin_is_single_flight() {
        let mut schedule = Schedule::new();
        assert!(schedule.begin());
        assert!(!schedule.begin());
    }

    #[test]
    fn skip_returns_to_idle() {
        let mut schedule = Schedule::new();
        schedule.trigger();
        schedule.skip();
        assert_eq!(schedule.state(), PipelineState::Idle);
    }

    #[test]
    fn cancel_clears_pending_but_not_compiling() {
        let mut schedule = Schedule::new();
        schedule.begin();
        schedule.trigger();
        schedule.cancel();
        assert_eq!(schedule.state(), PipelineState::Compiling);
        assert!(!schedule.finish());
        assert_eq!(schedule.state(), PipelineState::Idle);

        schedule.trigger();
        schedule.cancel();
        assert_eq!(schedule.state(), PipelineState::Idle);
    }

    #[test]
    fn finish_when_not_compiling_is_noop() {
        let mut schedule = Schedule::new();
        assert!(!schedule.finish());
        assert_eq!(schedule.state(), PipelineState::Idle);
    }
}
