//! Accelerated experiment run printed to the console.
//!
//! Drives a rig at one sample per second instead of per minute and logs the
//! mean readout as samples arrive. `RUST_LOG=debug` shows the scheduler's
//! session handling as well.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use thermocycle_core::{ExperimentProfile, ThermoResult, WindowConfig};
use thermocycle_runtime::{ExperimentScheduler, RigConfig, SystemClock};

#[tokio::main]
async fn main() -> ThermoResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 18→26 °C over a two-minute cycle, starting three seconds from now.
    let profile = ExperimentProfile::new(18.0, 26.0, 2.0, 0.05)?;
    let config = RigConfig {
        sample_interval: Duration::from_secs(1),
        window: WindowConfig::new(1.0, 15.0, 30.0)?,
    };

    let mut scheduler = ExperimentScheduler::new(config, Arc::new(SystemClock));
    let predicted = scheduler.predict(profile)?;
    tracing::info!(?predicted, "experiment predicted");

    let mut last_seen = None;
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if let Some(readout) = scheduler.latest_mean() {
            if last_seen != Some(readout.timestamp) {
                last_seen = Some(readout.timestamp);
                tracing::info!(
                    at = readout.timestamp.as_millis(),
                    mean_c = readout.value,
                    points = scheduler.snapshot().mean.len(),
                    "sample"
                );
            }
        }
    }

    scheduler.reset();
    tracing::info!("experiment cleared");
    Ok(())
}
