//! Simulated sensor bank
//!
//! Six independent sensors observing the theoretical curve through uniform
//! noise. The noise source is an explicit seam: production sampling draws
//! from an entropy-seeded RNG, tests inject seeded or silent sources and
//! assert bounds rather than exact values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use thermocycle_core::{SampleSet, SENSOR_COUNT};

use crate::TheoreticalCurve;

/// Largest deviation a sensor reading can have from the curve, in °C.
pub const NOISE_AMPLITUDE: f64 = 0.25;

/// Source of per-reading measurement noise, in °C.
pub trait NoiseSource {
    /// One noise draw; implementations stay within ±[`NOISE_AMPLITUDE`].
    fn draw(&mut self) -> f64;
}

/// Uniform noise in [-[`NOISE_AMPLITUDE`], +[`NOISE_AMPLITUDE`]].
pub struct UniformNoise {
    rng: StdRng,
}

impl UniformNoise {
    /// Entropy-seeded source for production sampling.
    pub fn from_entropy() -> Self {
        UniformNoise {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for tests and replayable simulations.
    pub fn with_seed(seed: u64) -> Self {
        UniformNoise {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for UniformNoise {
    fn draw(&mut self) -> f64 {
        self.rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE)
    }
}

/// The six-sensor array observing the experiment.
pub struct SensorBank<N: NoiseSource = UniformNoise> {
    noise: N,
}

impl SensorBank<UniformNoise> {
    pub fn new() -> Self {
        SensorBank {
            noise: UniformNoise::from_entropy(),
        }
    }
}

impl<N: NoiseSource> SensorBank<N> {
    /// Build a bank over a specific noise source.
    pub fn with_noise(noise: N) -> Self {
        SensorBank { noise }
    }

    /// Read all six sensors at `elapsed_minutes` and aggregate the mean.
    ///
    /// Noise is drawn independently per sensor, per call; the mean is the
    /// average of the noisy readings, not the noise-free value.
    pub fn sample(&mut self, curve: &TheoreticalCurve, elapsed_minutes: f64) -> SampleSet {
        let expected = curve.temp_at(elapsed_minutes);
        let mut readings = [0.0; SENSOR_COUNT];
        for reading in readings.iter_mut() {
            *reading = expected + self.noise.draw();
        }
        SampleSet::from_readings(readings)
    }
}

impl Default for SensorBank<UniformNoise> {
    fn default() -> Self {
        Self::new()
    }
}
