//! Windowed series store
//!
//! Observed series are append-only except for window trimming, which drops
//! a contiguous prefix of stale points. The theoretical series is never
//! appended to; it is rebuilt from scratch whenever the window moves.

use std::time::Duration;

use thermocycle_core::{
    SamplePoint, SampleSet, SensorId, ThermoError, ThermoResult, TimeWindow, Timestamp,
    SENSOR_COUNT,
};
use thermocycle_model::TheoreticalCurve;
use thermocycle_time::ExperimentClock;

/// Step between regenerated theoretical points.
pub const THEORETICAL_STRIDE: Duration = Duration::from_secs(60);

/// Rolling time-series state of one experiment.
#[derive(Debug, Default)]
pub struct WindowedSeriesStore {
    /// Observed series, one per sensor, indexed by [`SensorId`].
    sensors: [Vec<SamplePoint>; SENSOR_COUNT],
    /// Aggregated mean of the six sensors, same timestamps.
    mean: Vec<SamplePoint>,
    /// Noise-free curve over the active window.
    theoretical: Vec<SamplePoint>,
    /// Watermark for the out-of-order append guard.
    last_appended: Option<Timestamp>,
}

impl WindowedSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sampling tick's readings to every observed series.
    ///
    /// All seven points carry the same timestamp, which is what keeps the
    /// retained timestamp sets identical across series. Appends must be
    /// monotonic in time; a timestamp behind the previous append fails with
    /// `OutOfOrderSample` (unreachable under correct scheduling).
    pub fn append_sample(&mut self, timestamp: Timestamp, set: &SampleSet) -> ThermoResult<()> {
        if let Some(last) = self.last_appended {
            if timestamp < last {
                return Err(ThermoError::OutOfOrderSample {
                    last,
                    attempted: timestamp,
                });
            }
        }

        for (series, reading) in self.sensors.iter_mut().zip(set.readings) {
            series.push(SamplePoint::new(timestamp, reading));
        }
        self.mean.push(SamplePoint::new(timestamp, set.mean));
        self.last_appended = Some(timestamp);
        Ok(())
    }

    /// Drop observed points older than the window's lower bound.
    ///
    /// Every observed series (six sensors + mean) is trimmed in this one
    /// call, never individually. Points beyond `window.max` are retained
    /// untouched: only the lower bound is enforced.
    pub fn trim_to_window(&mut self, window: &TimeWindow) {
        for series in self.sensors.iter_mut() {
            Self::trim_series(series, window.min);
        }
        Self::trim_series(&mut self.mean, window.min);
    }

    fn trim_series(series: &mut Vec<SamplePoint>, min: Timestamp) {
        let keep_from = series.partition_point(|point| point.timestamp < min);
        if keep_from > 0 {
            series.drain(..keep_from);
        }
    }

    /// Clear and rebuild the theoretical series over `window`.
    ///
    /// Steps at [`THEORETICAL_STRIDE`] from max(reference, window.min) to
    /// window.max, evaluating the committed profile's curve at each step's
    /// elapsed time relative to the clock's reference instant. An idle
    /// clock empties the series: theoretical data is only ever shown
    /// relative to a predicted or actual start. Pure function of its
    /// arguments, so repeated calls with the same arguments are idempotent.
    pub fn regenerate_theoretical(&mut self, window: &TimeWindow, clock: &ExperimentClock) {
        self.theoretical.clear();

        let Some(reference) = clock.reference_instant() else {
            return;
        };
        let Some(profile) = clock.profile() else {
            return;
        };
        let curve = TheoreticalCurve::new(profile);

        let mut at = reference.max(window.min);
        while at <= window.max {
            let elapsed = at.minutes_since(reference);
            self.theoretical
                .push(SamplePoint::new(at, curve.temp_at(elapsed)));
            at = at + THEORETICAL_STRIDE;
        }
    }

    /// Drop all series content and the append watermark.
    pub fn clear(&mut self) {
        for series in self.sensors.iter_mut() {
            series.clear();
        }
        self.mean.clear();
        self.theoretical.clear();
        self.last_appended = None;
    }

    /// One sensor's observed series.
    pub fn sensor(&self, id: SensorId) -> &[SamplePoint] {
        &self.sensors[id.index()]
    }

    /// All six observed sensor series, indexed by sensor.
    pub fn sensor_series(&self) -> &[Vec<SamplePoint>; SENSOR_COUNT] {
        &self.sensors
    }

    pub fn mean_series(&self) -> &[SamplePoint] {
        &self.mean
    }

    pub fn theoretical_series(&self) -> &[SamplePoint] {
        &self.theoretical
    }

    /// Latest mean readout, if any samples are retained.
    pub fn latest_mean(&self) -> Option<SamplePoint> {
        self.mean.last().copied()
    }

    /// Number of retained points per observed series.
    pub fn observed_len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}
