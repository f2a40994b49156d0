//! Experiment rig - the owned state driven by the scheduler
//!
//! The rig aggregates the clock, the series store, the sensor bank and the
//! window configuration behind synchronous operations, each taking the
//! current instant as a parameter. Timers live elsewhere; everything here
//! is deterministic and directly testable.

use std::time::Duration;

use thermocycle_core::{
    ExperimentProfile, SamplePoint, ThermoError, ThermoResult, TimeWindow, Timestamp,
    WindowConfig, SENSOR_COUNT,
};
use thermocycle_model::{SensorBank, TheoreticalCurve, UniformNoise};
use thermocycle_series::WindowedSeriesStore;
use thermocycle_time::{ExperimentClock, ExperimentPhase, SessionToken};

/// Rig configuration
#[derive(Clone, Debug)]
pub struct RigConfig {
    /// Cadence of the periodic sampling timer.
    pub sample_interval: Duration,
    /// Initial axis-range configuration.
    pub window: WindowConfig,
}

impl Default for RigConfig {
    /// One sample per minute over the default one-hour window.
    fn default() -> Self {
        RigConfig {
            sample_interval: Duration::from_secs(60),
            window: WindowConfig::default(),
        }
    }
}

/// Counters exposed for diagnostics.
#[derive(Clone, Debug, Default)]
pub struct RigStats {
    pub predictions: u64,
    pub starts: u64,
    pub samples: u64,
    pub resets: u64,
    pub window_updates: u64,
    pub last_sample_at: Option<Timestamp>,
}

/// Read-only view of the rig for rendering and readout collaborators.
#[derive(Clone, Debug)]
pub struct ExperimentSnapshot {
    /// Observed series, one per sensor.
    pub sensors: [Vec<SamplePoint>; SENSOR_COUNT],
    /// Aggregated mean series.
    pub mean: Vec<SamplePoint>,
    /// Theoretical curve over the active window.
    pub theoretical: Vec<SamplePoint>,
    /// The active display window.
    pub window: TimeWindow,
    /// Display bounds for the temperature axis; the core never interprets
    /// them.
    pub y_min: f64,
    pub y_max: f64,
    /// Current lifecycle phase.
    pub phase: ExperimentPhase,
    /// Latest mean readout, if any.
    pub latest_mean: Option<SamplePoint>,
}

/// The per-experiment state owner.
pub struct ExperimentRig {
    clock: ExperimentClock,
    store: WindowedSeriesStore,
    sensors: SensorBank<UniformNoise>,
    config: RigConfig,
    window: TimeWindow,
    stats: RigStats,
}

impl ExperimentRig {
    /// Build a rig; the window starts centered on `now`.
    pub fn new(config: RigConfig, now: Timestamp) -> Self {
        Self::with_noise(config, UniformNoise::from_entropy(), now)
    }

    /// Build a rig over a specific noise source (seedable for replayable
    /// runs).
    pub fn with_noise(config: RigConfig, noise: UniformNoise, now: Timestamp) -> Self {
        let window = TimeWindow::centered(now, config.window.span());
        ExperimentRig {
            clock: ExperimentClock::new(),
            store: WindowedSeriesStore::new(),
            sensors: SensorBank::with_noise(noise),
            config,
            window,
            stats: RigStats::default(),
        }
    }

    /// Commit a profile: the clock moves to Predicted and the display
    /// window recenters on the predicted start.
    ///
    /// Returns the session token the scheduled start must present together
    /// with the predicted instant.
    pub fn predict(
        &mut self,
        profile: ExperimentProfile,
        now: Timestamp,
    ) -> ThermoResult<(SessionToken, Timestamp)> {
        let (token, predicted_start) = self.clock.predict(profile, now)?;
        self.window = TimeWindow::centered(predicted_start, self.config.window.span());
        self.store.regenerate_theoretical(&self.window, &self.clock);
        self.stats.predictions += 1;
        tracing::info!(?predicted_start, "experiment predicted");
        Ok((token, predicted_start))
    }

    /// Fire the scheduled Predicted→Running transition.
    ///
    /// Inert (`None`) when the token went stale. On success the window
    /// recenters on the actual start and the theoretical series follows.
    pub fn fire_start(&mut self, token: SessionToken, now: Timestamp) -> Option<Timestamp> {
        let started_at = self.clock.start(token, now)?;
        self.window = TimeWindow::centered(started_at, self.config.window.span());
        self.store.regenerate_theoretical(&self.window, &self.clock);
        self.stats.starts += 1;
        tracing::info!(?started_at, "experiment started");
        Some(started_at)
    }

    /// One sampling tick: read the sensors, append, recenter the window on
    /// `now`, trim, regenerate. Returns the mean readout point.
    ///
    /// The sequence runs under one `&mut self` borrow, so a tick is atomic
    /// with respect to every other writer.
    pub fn sample_tick(&mut self, now: Timestamp) -> ThermoResult<SamplePoint> {
        if !self.clock.is_running() {
            return Err(ThermoError::NotStarted);
        }
        let elapsed = self.clock.elapsed_minutes(now)?;
        let curve = match self.clock.profile() {
            Some(profile) => TheoreticalCurve::new(profile),
            None => return Err(ThermoError::NotStarted),
        };
        let set = self.sensors.sample(&curve, elapsed);

        self.store.append_sample(now, &set)?;
        self.window = TimeWindow::centered(now, self.config.window.span());
        self.store.trim_to_window(&self.window);
        self.store.regenerate_theoretical(&self.window, &self.clock);

        self.stats.samples += 1;
        self.stats.last_sample_at = Some(now);
        Ok(SamplePoint::new(now, set.mean))
    }

    /// Replace the axis-range configuration; the window recenters on `now`
    /// and the theoretical series is rebuilt over it.
    ///
    /// Observed series are not trimmed here; trimming happens on sampling
    /// ticks, immediately after the append.
    pub fn update_window(&mut self, window: WindowConfig, now: Timestamp) {
        self.config.window = window;
        self.window = TimeWindow::centered(now, window.span());
        self.store.regenerate_theoretical(&self.window, &self.clock);
        self.stats.window_updates += 1;
    }

    /// Adopt an externally chosen window (zoom/pan) and rebuild the
    /// theoretical series over it.
    pub fn refocus(&mut self, window: TimeWindow) {
        self.window = window;
        self.store.regenerate_theoretical(&self.window, &self.clock);
        self.stats.window_updates += 1;
    }

    /// Clear the experiment: idle clock, empty series, window recentered
    /// on `now`. Never fails.
    pub fn reset(&mut self, now: Timestamp) {
        self.clock.reset();
        self.store.clear();
        self.window = TimeWindow::centered(now, self.config.window.span());
        self.stats.resets += 1;
        tracing::info!("experiment reset");
    }

    /// Read-only copies for the rendering and readout collaborators.
    pub fn snapshot(&self) -> ExperimentSnapshot {
        ExperimentSnapshot {
            sensors: self.store.sensor_series().clone(),
            mean: self.store.mean_series().to_vec(),
            theoretical: self.store.theoretical_series().to_vec(),
            window: self.window,
            y_min: self.config.window.y_min(),
            y_max: self.config.window.y_max(),
            phase: self.clock.phase().clone(),
            latest_mean: self.store.latest_mean(),
        }
    }

    /// Latest mean readout, if any samples are retained.
    pub fn latest_mean(&self) -> Option<SamplePoint> {
        self.store.latest_mean()
    }

    #[inline]
    pub fn session(&self) -> SessionToken {
        self.clock.session()
    }

    #[inline]
    pub fn phase(&self) -> &ExperimentPhase {
        self.clock.phase()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// The active display window.
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn sample_interval(&self) -> Duration {
        self.config.sample_interval
    }

    pub fn clock(&self) -> &ExperimentClock {
        &self.clock
    }

    pub fn store(&self) -> &WindowedSeriesStore {
        &self.store
    }

    pub fn stats(&self) -> &RigStats {
        &self.stats
    }
}
