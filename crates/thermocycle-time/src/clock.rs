//! The predicted/running experiment clock
//!
//! INVARIANT: at most one reference instant exists at any time; each phase
//! variant carries its own. The Predicted→Running transition consumes the
//! predicted start and is guarded by a session token, so a one-shot timer
//! that outlives a reset (or a re-prediction) cannot move the clock.

use thermocycle_core::{ExperimentProfile, ThermoError, ThermoResult, Timestamp};

/// Monotonic counter identifying one prediction session.
///
/// Bumped on every `predict` and `reset`. Two predictions with identical
/// parameters get distinct tokens, which is what makes a stale scheduled
/// start distinguishable from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Phase of the experiment lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentPhase {
    /// No profile committed, no reference instant.
    Idle,
    /// Offset computed but not yet elapsed; sampling not active.
    Predicted {
        profile: ExperimentProfile,
        predicted_start: Timestamp,
    },
    /// Offset elapsed; sampling active.
    Running {
        profile: ExperimentProfile,
        started_at: Timestamp,
    },
}

/// The experiment state machine.
pub struct ExperimentClock {
    phase: ExperimentPhase,
    session: u64,
}

impl ExperimentClock {
    pub fn new() -> Self {
        ExperimentClock {
            phase: ExperimentPhase::Idle,
            session: 0,
        }
    }

    /// Commit a profile and compute its predicted start.
    ///
    /// Fails with `AlreadyRunning` while Running; otherwise overwrites any
    /// Idle/Predicted state (re-prediction is always allowed), bumps the
    /// session, and returns the token the scheduled start must present
    /// together with the predicted instant.
    pub fn predict(
        &mut self,
        profile: ExperimentProfile,
        now: Timestamp,
    ) -> ThermoResult<(SessionToken, Timestamp)> {
        if matches!(self.phase, ExperimentPhase::Running { .. }) {
            return Err(ThermoError::AlreadyRunning);
        }

        let predicted_start = now + profile.start_offset();
        self.session += 1;
        self.phase = ExperimentPhase::Predicted {
            profile,
            predicted_start,
        };
        Ok((SessionToken(self.session), predicted_start))
    }

    /// The Predicted→Running transition, fired by the one-shot timer.
    ///
    /// Returns `None` when the token is stale or the clock is no longer
    /// Predicted: a scheduled start that lost its session is a no-op, not
    /// an error. On success the profile moves into Running and the actual
    /// start instant is returned.
    pub fn start(&mut self, token: SessionToken, now: Timestamp) -> Option<Timestamp> {
        if token.0 != self.session {
            return None;
        }

        match std::mem::replace(&mut self.phase, ExperimentPhase::Idle) {
            ExperimentPhase::Predicted { profile, .. } => {
                self.phase = ExperimentPhase::Running {
                    profile,
                    started_at: now,
                };
                Some(now)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Force Idle and invalidate every pending scheduled transition.
    /// Idempotent, never fails.
    pub fn reset(&mut self) {
        self.session += 1;
        self.phase = ExperimentPhase::Idle;
    }

    /// Minutes between the reference instant and `at`; negative before it.
    ///
    /// The reference is the actual start when Running, the predicted start
    /// when Predicted; `NotStarted` when Idle.
    pub fn elapsed_minutes(&self, at: Timestamp) -> ThermoResult<f64> {
        match self.reference_instant() {
            Some(reference) => Ok(at.minutes_since(reference)),
            None => Err(ThermoError::NotStarted),
        }
    }

    /// The instant elapsed time is measured from, if any.
    pub fn reference_instant(&self) -> Option<Timestamp> {
        match &self.phase {
            ExperimentPhase::Idle => None,
            ExperimentPhase::Predicted {
                predicted_start, ..
            } => Some(*predicted_start),
            ExperimentPhase::Running { started_at, .. } => Some(*started_at),
        }
    }

    /// The committed profile, if any.
    pub fn profile(&self) -> Option<&ExperimentProfile> {
        match &self.phase {
            ExperimentPhase::Idle => None,
            ExperimentPhase::Predicted { profile, .. }
            | ExperimentPhase::Running { profile, .. } => Some(profile),
        }
    }

    #[inline]
    pub fn session(&self) -> SessionToken {
        SessionToken(self.session)
    }

    #[inline]
    pub fn phase(&self) -> &ExperimentPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, ExperimentPhase::Idle)
    }

    pub fn is_predicted(&self) -> bool {
        matches!(self.phase, ExperimentPhase::Predicted { .. })
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, ExperimentPhase::Running { .. })
    }
}

impl Default for ExperimentClock {
    fn default() -> Self {
        Self::new()
    }
}
