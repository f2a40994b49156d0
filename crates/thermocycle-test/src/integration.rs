//! End-to-end scenario suite
//!
//! Drives the full stack (clock, store, rig, simulated timers) through the
//! experiment lifecycle: delayed starts, rolling windows, resets, and the
//! observed-vs-theoretical agreement bound.

use thermocycle_core::{ExperimentProfile, Timestamp, MILLIS_PER_MINUTE};
use thermocycle_runtime::RigConfig;

use crate::ExperimentSimulator;

/// Instant at the n-th minute of simulated time.
pub fn minute(n: i64) -> Timestamp {
    Timestamp::from_millis(n * MILLIS_PER_MINUTE)
}

/// The reference profile used across scenarios: 20→25 °C over a one-hour
/// cycle.
pub fn cycle_profile(offset_minutes: f64) -> ExperimentProfile {
    ExperimentProfile::new(20.0, 25.0, 60.0, offset_minutes).unwrap()
}

/// A simulator whose experiment is already running, started at minute 0.
pub fn immediate_run(seed: u64) -> ExperimentSimulator {
    let mut sim = ExperimentSimulator::new(RigConfig::default(), minute(0), seed);
    sim.predict(cycle_profile(0.0)).unwrap();
    sim.advance(std::time::Duration::ZERO);
    sim
}

/// A simulator holding a prediction that will start after `offset_minutes`.
pub fn delayed_run(offset_minutes: f64, seed: u64) -> ExperimentSimulator {
    let mut sim = ExperimentSimulator::new(RigConfig::default(), minute(0), seed);
    sim.predict(cycle_profile(offset_minutes)).unwrap();
    sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermocycle_core::{ThermoError, TimeWindow, WindowConfig};
    use thermocycle_model::{TheoreticalCurve, NOISE_AMPLITUDE};
    use thermocycle_time::ExperimentPhase;

    #[test]
    fn test_quarter_cycle_theoretical_readout() {
        let mut sim = immediate_run(3);
        sim.advance_minutes(15);

        // The regenerated curve carries the quarter-cycle values: midpoint
        // at the start, peak a quarter cycle in.
        let snapshot = sim.snapshot();
        let value_at = |t: Timestamp| {
            snapshot
                .theoretical
                .iter()
                .find(|p| p.timestamp == t)
                .map(|p| p.value)
                .unwrap()
        };

        assert!((value_at(minute(0)) - 22.5).abs() < 1e-9);
        assert!((value_at(minute(15)) - 25.0).abs() < 1e-9);
        assert!((value_at(minute(30)) - 22.5).abs() < 1e-9);
        assert!((value_at(minute(45)) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_observed_mean_tracks_curve_within_noise() {
        let mut sim = immediate_run(17);
        sim.advance_minutes(25);

        let curve = TheoreticalCurve::new(&cycle_profile(0.0));
        let started = minute(0);
        for point in &sim.snapshot().mean {
            let elapsed = point.timestamp.minutes_since(started);
            let expected = curve.temp_at(elapsed);
            assert!(
                (point.value - expected).abs() <= NOISE_AMPLITUDE + 1e-12,
                "mean strayed at elapsed {elapsed}"
            );
        }
    }

    #[test]
    fn test_rolling_window_retention() {
        let mut sim = immediate_run(5);
        // Samples land at minutes 0..=89; the 90th sample is at minute 89.
        sim.advance_minutes(89);

        let snapshot = sim.snapshot();
        assert_eq!(
            snapshot.window,
            TimeWindow::new(minute(59), minute(119)).unwrap()
        );

        // Everything at or after the window's lower bound is retained,
        // nothing older survives, and all seven observed series agree.
        let mean_stamps: Vec<Timestamp> =
            snapshot.mean.iter().map(|p| p.timestamp).collect();
        assert_eq!(mean_stamps.first(), Some(&minute(59)));
        assert_eq!(mean_stamps.last(), Some(&minute(89)));
        assert_eq!(mean_stamps.len(), 31);
        assert!(mean_stamps.iter().all(|t| *t >= snapshot.window.min));

        for sensor in &snapshot.sensors {
            let stamps: Vec<Timestamp> = sensor.iter().map(|p| p.timestamp).collect();
            assert_eq!(stamps, mean_stamps);
        }
    }

    #[test]
    fn test_delayed_start_enters_running_autonomously() {
        let mut sim = delayed_run(5.0, 7);

        sim.advance_minutes(4);
        assert!(matches!(
            sim.snapshot().phase,
            ExperimentPhase::Predicted { .. }
        ));
        assert!(sim.snapshot().mean.is_empty());

        sim.advance_minutes(1);
        match sim.snapshot().phase {
            ExperimentPhase::Running { started_at, .. } => {
                assert_eq!(started_at, minute(5));
            }
            other => panic!("expected Running, got {other:?}"),
        }
        // Sampling began at the start instant, not one cadence later.
        assert_eq!(sim.latest_mean().unwrap().timestamp, minute(5));
    }

    #[test]
    fn test_reset_keeps_stale_one_shot_inert() {
        let mut sim = delayed_run(5.0, 7);

        sim.reset();
        // The simulator intentionally leaves the armed one-shot in place;
        // advancing past its due instant fires it against a stale token.
        sim.advance_minutes(10);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.phase, ExperimentPhase::Idle);
        assert!(snapshot.mean.is_empty());
        assert!(snapshot.theoretical.is_empty());
    }

    #[test]
    fn test_reset_mid_run_stops_sampling() {
        let mut sim = immediate_run(11);
        sim.advance_minutes(10);
        assert_eq!(sim.snapshot().mean.len(), 11);

        sim.reset();
        sim.advance_minutes(10);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.phase, ExperimentPhase::Idle);
        assert!(snapshot.mean.is_empty());
    }

    #[test]
    fn test_repredict_supersedes_earlier_prediction() {
        let mut sim = delayed_run(30.0, 7);
        sim.advance_minutes(1);

        // Re-predicting replaces the pending session outright.
        let second = sim.predict(cycle_profile(2.0)).unwrap();
        assert_eq!(second, minute(3));

        sim.advance_minutes(5);
        match sim.snapshot().phase {
            ExperimentPhase::Running { started_at, .. } => {
                assert_eq!(started_at, minute(3));
            }
            other => panic!("expected Running, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_while_running_is_rejected() {
        let mut sim = immediate_run(13);
        sim.advance_minutes(1);

        let err = sim.predict(cycle_profile(0.0)).unwrap_err();
        assert!(matches!(err, ThermoError::AlreadyRunning));

        // The running experiment is untouched.
        assert!(matches!(
            sim.snapshot().phase,
            ExperimentPhase::Running { .. }
        ));
    }

    #[test]
    fn test_update_window_widens_retention() {
        let mut sim = immediate_run(19);
        sim.advance_minutes(40);

        // Widen to two hours mid-run; subsequent ticks trim against the
        // wider window, so older points survive longer.
        sim.update_window(WindowConfig::new(2.0, 5.0, 30.0).unwrap());
        sim.advance_minutes(50);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.y_min, 5.0);
        assert_eq!(snapshot.y_max, 30.0);
        assert_eq!(
            snapshot.window,
            TimeWindow::new(minute(30), minute(150)).unwrap()
        );
        assert_eq!(
            snapshot.mean.first().map(|p| p.timestamp),
            Some(minute(30))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_with_manual_clock() {
        use std::sync::Arc;
        use std::time::Duration;
        use thermocycle_runtime::ExperimentScheduler;

        use crate::ManualClock;

        // The tokio clock drives the timers; the manual source supplies the
        // timestamps, so the recorded series is fully deterministic.
        let source = Arc::new(ManualClock::new(minute(0)));
        let mut scheduler = ExperimentScheduler::new(RigConfig::default(), source.clone());

        scheduler.predict(cycle_profile(0.0)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        source.advance(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(60)).await;

        let stamps: Vec<Timestamp> = scheduler
            .snapshot()
            .mean
            .iter()
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(stamps, vec![minute(0), minute(1)]);

        scheduler.reset();
        assert!(scheduler.snapshot().mean.is_empty());
    }

    #[test]
    fn test_refocus_moves_theoretical_not_observed() {
        let mut sim = immediate_run(23);
        sim.advance_minutes(10);
        let observed_before = sim.snapshot().mean.len();

        let panned = TimeWindow::new(minute(60), minute(120)).unwrap();
        sim.refocus(panned);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.window, panned);
        assert_eq!(snapshot.mean.len(), observed_before);
        assert_eq!(
            snapshot.theoretical.first().map(|p| p.timestamp),
            Some(minute(60))
        );
        assert_eq!(
            snapshot.theoretical.last().map(|p| p.timestamp),
            Some(minute(120))
        );
    }
}
