//! Thermocycle Series - Windowed time-series store
//!
//! This crate owns the rolling data of one experiment: six observed sensor
//! series, the aggregated mean series, and the theoretical series
//! regenerated over the active time window. Observed series are always
//! trimmed as one unit so they cannot desynchronize.

pub mod store;

pub use store::*;
