//! Fluid Light - simulation core for an animated "fluid light" visualization
//!
//! Core modules:
//! - `sim`: Deterministic simulation (orb cluster, particle fusion game, breathing)
//! - `driver`: Frame clock, input hand-off and the per-frame engine
//! - `feedback`: Haptic/audio collaborator interfaces
//! - `renderer`: GPU-ready instance data for an external renderer
//! - `settings`: Data-driven tuning and preferences

pub mod driver;
pub mod feedback;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use driver::{Engine, FrameClock, FrameInput, FrameSnapshot, InputBuffer};
pub use settings::Settings;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Nominal step used when no previous frame timestamp exists (60 Hz)
    pub const NOMINAL_DT: f32 = 1.0 / 60.0;
    /// Largest step a single tick may integrate (protects against resume-from-background jumps)
    pub const MAX_DT: f32 = 0.1;
    /// Reference frame rate that per-tick factors are tuned against
    pub const REFERENCE_FPS: f32 = 60.0;

    /// Smallest canvas extent used when computing spawn areas
    pub const MIN_CANVAS_EXTENT: f32 = 1.0;
    /// Distances below this are treated as zero for normalization
    pub const DEGENERATE_DISTANCE: f32 = 1e-3;

    /// Orb cluster defaults
    pub const ORB_COUNT: usize = 6;
    pub const MAX_ORB_COUNT: usize = 1024;
    pub const ORB_BASE_RADIUS: f32 = 60.0;
    /// Radius swing at amplitude multiplier 1.0
    pub const ORB_RADIUS_SWING: f32 = 5.0;
    /// Wander offset at amplitude multiplier 1.0
    pub const ORB_WANDER_RADIUS: f32 = 40.0;
    pub const ORB_INTERACT_PULL: f32 = 0.08;
    pub const ORB_IDLE_PULL: f32 = 0.05;
    /// Global oscillation rate at speed multiplier 1.0 (rad/s)
    pub const ORB_PHASE_RATE: f32 = 1.2;
    /// Max initial spawn offset from canvas center
    pub const ORB_SPAWN_JITTER: f32 = 20.0;
    pub const ORB_INITIAL_SPEED: f32 = 30.0;
    /// Residual drift damping per 60 Hz tick
    pub const ORB_DRIFT_DAMPING: f32 = 0.98;

    /// Stability-to-dynamics mapping
    pub const SPEED_MIN: f32 = 0.3;
    pub const SPEED_CHAOS_GAIN: f32 = 2.2;
    pub const AMPLITUDE_MIN: f32 = 0.5;
    pub const AMPLITUDE_CHAOS_GAIN: f32 = 1.0;

    /// Particle game defaults
    pub const PARTICLE_COUNT: usize = 60;
    pub const MAX_PARTICLE_COUNT: usize = 4096;
    pub const HALO_RADIUS: f32 = 100.0;
    pub const ORBIT_RADIUS: f32 = 60.0;
    /// Orbit angular rate (rad/s)
    pub const ORBIT_ANGULAR_SPEED: f32 = 2.0;
    /// Seconds of continuous orbiting before fusion starts
    pub const ORBIT_DURATION: f32 = 2.5;
    pub const FUSION_DISTANCE: f32 = 5.0;
    /// Easing factors per 60 Hz tick
    pub const ORBIT_EASING: f32 = 0.1;
    pub const FUSION_EASING: f32 = 0.2;
    /// Minimum steadiness (1 - local instability) for a capture
    pub const CAPTURE_STEADINESS: f32 = 0.3;
    /// Free-floating random walk acceleration bound (units/s²)
    pub const WANDER_ACCEL: f32 = 1500.0;
    /// Initial free-floating speed bound (units/s)
    pub const WANDER_SPAWN_SPEED: f32 = 60.0;
    /// Velocity damping per 60 Hz tick while chaotic
    pub const WANDER_DAMPING: f32 = 0.98;
    /// Release scatter speed band (units/s)
    pub const SCATTER_MIN_SPEED: f32 = 180.0;
    pub const SCATTER_MAX_SPEED: f32 = 320.0;

    /// Touch movement per tick that counts as jitter
    pub const JITTER_THRESHOLD: f32 = 8.0;
    /// Instability gained per jittery 60 Hz tick
    pub const JITTER_RISE: f32 = 0.15;
    /// Instability kept per calm 60 Hz tick
    pub const JITTER_DECAY: f32 = 0.92;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Bearing of `point` as seen from `origin` (radians)
#[inline]
pub fn bearing(origin: Vec2, point: Vec2) -> f32 {
    let d = point - origin;
    d.y.atan2(d.x)
}

/// Clamp a frame delta into `[0, MAX_DT]`; non-finite deltas become the nominal step
#[inline]
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, consts::MAX_DT)
    } else {
        consts::NOMINAL_DT
    }
}

/// Convert a per-60Hz-tick easing factor into the factor for `dt` seconds
///
/// Exponential easing: after one reference tick the remaining distance is `1 - per_tick`.
#[inline]
pub fn ease_factor(per_tick: f32, dt: f32) -> f32 {
    let per_tick = per_tick.clamp(0.0, 1.0);
    (1.0 - (1.0 - per_tick).powf(dt * consts::REFERENCE_FPS)).clamp(0.0, 1.0)
}

/// Per-tick multiplicative damping converted to `dt` seconds
#[inline]
pub fn damping(per_tick: f32, dt: f32) -> f32 {
    per_tick.clamp(0.0, 1.0).powf(dt * consts::REFERENCE_FPS)
}

/// Linear interpolation between two points
#[inline]
pub fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Replace a non-finite scalar with `fallback`
#[inline]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Replace a vector with any non-finite component with `fallback`
#[inline]
pub fn finite_vec_or(value: Vec2, fallback: Vec2) -> Vec2 {
    if value.is_finite() { value } else { fallback }
}

/// Unit vector along `v`, or `fallback` when `v` is degenerately short
#[inline]
pub fn direction_or(v: Vec2, fallback: Vec2) -> Vec2 {
    if v.length_squared() < consts::DEGENERATE_DISTANCE * consts::DEGENERATE_DISTANCE {
        return fallback;
    }
    v.try_normalize().unwrap_or(fallback)
}

/// Canvas size with each extent clamped to at least `MIN_CANVAS_EXTENT`
#[inline]
pub fn safe_canvas(size: Vec2) -> Vec2 {
    let size = finite_vec_or(size, Vec2::ZERO);
    size.max(Vec2::splat(consts::MIN_CANVAS_EXTENT))
}
