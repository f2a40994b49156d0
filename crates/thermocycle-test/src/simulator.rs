//! Experiment simulator - timer semantics without a runtime
//!
//! Replicates what the tokio driver does to a rig (one-shot delayed start,
//! periodic sampling with an immediate first tick, session-token guards)
//! as a synchronous event loop over simulated time. Unlike the real
//! scheduler, `reset` here deliberately leaves armed timers in place: the
//! stale callbacks still fire on `advance`, which is exactly how the
//! token guard gets exercised.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;

use thermocycle_core::{
    ExperimentProfile, SamplePoint, ThermoResult, TimeWindow, Timestamp, WindowConfig,
    MILLIS_PER_MINUTE,
};
use thermocycle_model::UniformNoise;
use thermocycle_runtime::{ClockSource, ExperimentRig, ExperimentSnapshot, RigConfig};
use thermocycle_time::SessionToken;

/// Clock source advanced by hand, for driving the runtime deterministically.
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            now_ms: AtomicI64::new(start.as_millis()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ms
            .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, now: Timestamp) {
        self.now_ms.store(now.as_millis(), Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

/// An armed periodic sampler.
#[derive(Clone, Copy, Debug)]
struct Sampler {
    token: SessionToken,
    next_due: Timestamp,
}

/// Event-driven driver for one rig over simulated time.
pub struct ExperimentSimulator {
    rig: ExperimentRig,
    now: Timestamp,
    sample_interval: Duration,
    pending_start: Option<(SessionToken, Timestamp)>,
    sampler: Option<Sampler>,
}

impl ExperimentSimulator {
    /// Build a simulator with seeded sensor noise, starting at `start`.
    pub fn new(config: RigConfig, start: Timestamp, seed: u64) -> Self {
        let sample_interval = config.sample_interval;
        ExperimentSimulator {
            rig: ExperimentRig::with_noise(config, UniformNoise::with_seed(seed), start),
            now: start,
            sample_interval,
            pending_start: None,
            sampler: None,
        }
    }

    /// Commit a profile at the current simulated instant and arm the
    /// one-shot start.
    pub fn predict(&mut self, profile: ExperimentProfile) -> ThermoResult<Timestamp> {
        let (token, predicted_start) = self.rig.predict(profile, self.now)?;
        self.pending_start = Some((token, predicted_start));
        Ok(predicted_start)
    }

    /// Clear the experiment. Armed timers are left in place on purpose;
    /// their tokens are stale and firing them must be a no-op.
    pub fn reset(&mut self) {
        self.rig.reset(self.now);
    }

    /// Replace the axis-range configuration at the current instant.
    pub fn update_window(&mut self, window: WindowConfig) {
        self.rig.update_window(window, self.now);
    }

    /// Adopt an externally chosen window (zoom/pan).
    pub fn refocus(&mut self, window: TimeWindow) {
        self.rig.refocus(window);
    }

    /// Advance simulated time, firing every due timer in order.
    pub fn advance(&mut self, duration: Duration) {
        let end = self.now + duration;
        loop {
            match self.next_due() {
                Some(due) if due <= end => {
                    self.now = self.now.max(due);
                    self.fire_due();
                }
                _ => break,
            }
        }
        self.now = end;
    }

    pub fn advance_minutes(&mut self, minutes: u64) {
        self.advance(Duration::from_secs(minutes * 60));
    }

    /// Advance in random sub-steps totalling `duration`, for exercising
    /// timer-boundary alignment.
    pub fn advance_jittered(&mut self, duration: Duration, rng: &mut StdRng) {
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            let step_ms = rng.gen_range(1..=2 * MILLIS_PER_MINUTE as u64);
            let step = Duration::from_millis(step_ms).min(remaining);
            self.advance(step);
            remaining -= step;
        }
    }

    fn next_due(&self) -> Option<Timestamp> {
        let start_due = self.pending_start.map(|(_, due)| due);
        let sample_due = self.sampler.map(|s| s.next_due);
        match (start_due, sample_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Fire everything due at the current instant: the one-shot first (it
    /// may arm the sampler whose first tick is immediate), then the
    /// sampler.
    fn fire_due(&mut self) {
        if let Some((token, due)) = self.pending_start {
            if due <= self.now {
                self.pending_start = None;
                if self.rig.fire_start(token, self.now).is_some() {
                    self.sampler = Some(Sampler {
                        token,
                        next_due: self.now,
                    });
                }
            }
        }

        loop {
            let Some(sampler) = self.sampler else { break };
            if sampler.next_due > self.now {
                break;
            }
            if self.rig.session() != sampler.token || self.rig.sample_tick(self.now).is_err() {
                self.sampler = None;
                break;
            }
            self.sampler = Some(Sampler {
                token: sampler.token,
                next_due: sampler.next_due + self.sample_interval,
            });
        }
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn rig(&self) -> &ExperimentRig {
        &self.rig
    }

    pub fn snapshot(&self) -> ExperimentSnapshot {
        self.rig.snapshot()
    }

    pub fn latest_mean(&self) -> Option<SamplePoint> {
        self.rig.latest_mean()
    }
}
