//! Renderer boundary
//!
//! Drawing, blending and blur happen in the host renderer. This module only
//! turns simulation snapshots into tightly packed instance data it can upload.

pub mod instance;

pub use instance::{OrbInstance, Palette, ParticleInstance, orb_instances, particle_instances};
