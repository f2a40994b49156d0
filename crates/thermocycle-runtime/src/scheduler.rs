//! Tokio driver for the experiment timers
//!
//! One task per prediction session: a one-shot sleep until the predicted
//! start, then a periodic sampling loop whose first tick fires immediately.
//! The task re-checks the session token on every touch of the rig, so the
//! abort on reset is a latency optimization, not a correctness requirement:
//! a callback that outlives its session is provably inert.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use thermocycle_core::{
    ExperimentProfile, SamplePoint, ThermoResult, TimeWindow, Timestamp, WindowConfig,
};

use crate::{ClockSource, ExperimentRig, ExperimentSnapshot, RigConfig};

/// Owns the shared rig and the driver task of the active session.
pub struct ExperimentScheduler {
    rig: Arc<Mutex<ExperimentRig>>,
    source: Arc<dyn ClockSource>,
    sample_interval: Duration,
    driver: Option<JoinHandle<()>>,
}

impl ExperimentScheduler {
    /// Build a scheduler over a fresh rig.
    pub fn new(config: RigConfig, source: Arc<dyn ClockSource>) -> Self {
        let sample_interval = config.sample_interval;
        let now = source.now();
        ExperimentScheduler {
            rig: Arc::new(Mutex::new(ExperimentRig::new(config, now))),
            source,
            sample_interval,
            driver: None,
        }
    }

    /// Commit a profile and arm the delayed start.
    ///
    /// Fails with `AlreadyRunning` while an experiment is running (timers
    /// never stack); while merely Predicted the previous driver is aborted
    /// and replaced. Must be called within a tokio runtime.
    pub fn predict(&mut self, profile: ExperimentProfile) -> ThermoResult<Timestamp> {
        let now = self.source.now();
        let (token, predicted_start) = self.rig.lock().predict(profile, now)?;

        self.abort_driver();

        let rig = Arc::clone(&self.rig);
        let source = Arc::clone(&self.source);
        let interval = self.sample_interval;
        let delay = predicted_start - now;

        self.driver = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if rig.lock().fire_start(token, source.now()).is_none() {
                // A reset or re-prediction got here first.
                return;
            }
            tracing::debug!(session = token.value(), "sampling loop armed");

            let mut ticker = tokio::time::interval(interval);
            loop {
                // The first tick completes immediately: the sample at the
                // start instant is not delayed by one cadence period.
                ticker.tick().await;
                {
                    let mut rig = rig.lock();
                    if rig.session() != token {
                        return;
                    }
                    if rig.sample_tick(source.now()).is_err() {
                        return;
                    }
                }
            }
        }));

        Ok(predicted_start)
    }

    /// Cancel pending timers, then clear the experiment. Always succeeds.
    pub fn reset(&mut self) {
        self.abort_driver();
        self.rig.lock().reset(self.source.now());
    }

    /// Replace the axis-range configuration.
    pub fn update_window(&mut self, window: WindowConfig) {
        self.rig.lock().update_window(window, self.source.now());
    }

    /// Adopt an externally chosen window (zoom/pan).
    pub fn refocus(&mut self, window: TimeWindow) {
        self.rig.lock().refocus(window);
    }

    /// Read-only copies for rendering collaborators.
    pub fn snapshot(&self) -> ExperimentSnapshot {
        self.rig.lock().snapshot()
    }

    /// Latest mean readout for the display ticker.
    pub fn latest_mean(&self) -> Option<SamplePoint> {
        self.rig.lock().latest_mean()
    }

    /// Handle to the shared rig for collaborators that poll it directly.
    pub fn rig(&self) -> Arc<Mutex<ExperimentRig>> {
        Arc::clone(&self.rig)
    }

    fn abort_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for ExperimentScheduler {
    fn drop(&mut self) {
        self.abort_driver();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SystemClock;
    use thermocycle_core::ThermoError;
    use thermocycle_time::ExperimentPhase;

    fn profile(offset_minutes: f64) -> ExperimentProfile {
        ExperimentProfile::new(20.0, 25.0, 60.0, offset_minutes).unwrap()
    }

    fn scheduler() -> ExperimentScheduler {
        ExperimentScheduler::new(RigConfig::default(), Arc::new(SystemClock))
    }

    #[tokio::test(start_paused = true)]
    async fn test_offset_elapses_into_running() {
        let mut scheduler = scheduler();

        scheduler.predict(profile(5.0)).unwrap();
        assert!(matches!(
            scheduler.snapshot().phase,
            ExperimentPhase::Predicted { .. }
        ));

        // Paused time races through the 5-minute offset and the first
        // sampling ticks; the extra half minute keeps the assertion clear
        // of the cadence boundary.
        tokio::time::sleep(Duration::from_secs(6 * 60 + 30)).await;

        let snapshot = scheduler.snapshot();
        assert!(matches!(snapshot.phase, ExperimentPhase::Running { .. }));
        assert!(!snapshot.mean.is_empty());
        assert!(snapshot.mean.len() >= 2, "first sample plus cadence ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sample_is_immediate() {
        let mut scheduler = scheduler();

        scheduler.predict(profile(0.0)).unwrap();
        // Well under one cadence period: only the immediate first tick can
        // have fired.
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = scheduler.snapshot();
        assert!(matches!(snapshot.phase, ExperimentPhase::Running { .. }));
        assert_eq!(snapshot.mean.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predict_while_running_rejected() {
        let mut scheduler = scheduler();

        scheduler.predict(profile(0.0)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.snapshot().phase != ExperimentPhase::Idle);

        let err = scheduler.predict(profile(0.0)).unwrap_err();
        assert!(matches!(err, ThermoError::AlreadyRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repredict_replaces_pending_start() {
        let mut scheduler = scheduler();

        let first = scheduler.predict(profile(60.0)).unwrap();
        let second = scheduler.predict(profile(0.0)).unwrap();
        assert!(second < first);

        tokio::time::sleep(Duration::from_secs(1)).await;

        // The second prediction runs; the first one-shot never lands.
        let snapshot = scheduler.snapshot();
        assert!(matches!(snapshot.phase, ExperimentPhase::Running { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_start() {
        let mut scheduler = scheduler();

        scheduler.predict(profile(5.0)).unwrap();
        scheduler.reset();

        // Long past the predicted start; a stale one-shot would have fired
        // by now if it were still live.
        tokio::time::sleep(Duration::from_secs(20 * 60)).await;

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.phase, ExperimentPhase::Idle);
        assert!(snapshot.mean.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stops_sampling() {
        let mut scheduler = scheduler();

        scheduler.predict(profile(0.0)).unwrap();
        tokio::time::sleep(Duration::from_secs(3 * 60)).await;
        assert!(!scheduler.snapshot().mean.is_empty());

        scheduler.reset();
        let after_reset = scheduler.snapshot();
        assert_eq!(after_reset.phase, ExperimentPhase::Idle);
        assert!(after_reset.mean.is_empty());

        // No stale tick resurrects data.
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert!(scheduler.snapshot().mean.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_then_new_experiment() {
        let mut scheduler = scheduler();

        scheduler.predict(profile(0.0)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.reset();

        scheduler.predict(profile(0.0)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = scheduler.snapshot();
        assert!(matches!(snapshot.phase, ExperimentPhase::Running { .. }));
        assert_eq!(snapshot.mean.len(), 1);
    }
}
