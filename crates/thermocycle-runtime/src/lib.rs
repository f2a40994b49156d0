//! Thermocycle Runtime - Rig state and timer drivers
//!
//! The rig owns the clock, the series store and the sensor bank behind
//! synchronous operations; the scheduler drives it with tokio timers: a
//! one-shot delayed start and a periodic sampling loop, both made inert on
//! reset via session tokens.

pub mod rig;
pub mod scheduler;
pub mod source;

pub use rig::*;
pub use scheduler::*;
pub use source::*;
