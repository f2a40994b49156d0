//! Thermocycle Model - The physical model of the experiment
//!
//! This crate implements the noise-free theoretical temperature curve and
//! the six-sensor simulated bank that observes it through uniform noise.

pub mod curve;
pub mod sensors;

pub use curve::*;
pub use sensors::*;
