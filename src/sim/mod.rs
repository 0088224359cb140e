//! Deterministic simulation module
//!
//! All motion logic lives here. This module must be pure and deterministic:
//! - Caller-supplied, capped delta time only
//! - Seeded RNG only (one stream per simulator)
//! - Stable iteration order (by particle id / orb index)
//! - No rendering, audio or platform dependencies

pub mod breath;
pub mod jitter;
pub mod orbs;
pub mod particles;
pub mod rng;

pub use breath::{BreathCycle, BreathPhase, BreathSnapshot};
pub use jitter::JitterMeter;
pub use orbs::{DynamicsProfile, Orb, OrbCluster, OrbInput, OrbMode, OrbSnapshot};
pub use particles::{
    Census, Particle, ParticleColor, ParticleEvent, ParticleField, ParticleInput,
    ParticleSnapshot, ParticleState, ParticleStateTag,
};
pub use rng::RngState;
