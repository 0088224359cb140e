//! Orb cluster simulation
//!
//! A fixed set of light orbs whose collective motion encodes the external
//! stability signal. Low stability means fast, wide wandering; high stability
//! means slow, tight breathing around the seek point. The cluster follows the
//! interaction target while the user touches the canvas and drifts around the
//! canvas center otherwise.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::rng::{self, RngState};
use crate::consts::*;
use crate::settings::OrbSettings;
use crate::{damping, finite_or, finite_vec_or, safe_canvas, sanitize_dt};

/// How much of the simulation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrbMode {
    /// Attraction, wander and radius breathing
    #[default]
    Fluid,
    /// Attraction and radius breathing, no wander jitter
    Static,
    /// No integration at all (previews, splash screens)
    Frozen,
}

/// Motion character derived from the stability signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsProfile {
    /// `1 - stability / 100`
    pub chaos: f32,
    /// Oscillation speed multiplier (0.3 calm .. 2.5 chaotic)
    pub speed: f32,
    /// Wander/radius amplitude multiplier (0.5 calm .. 1.5 chaotic)
    pub amplitude: f32,
}

impl DynamicsProfile {
    /// Map a stability value in [0, 100] to dynamics multipliers
    pub fn from_stability(stability: f32) -> Self {
        let chaos = (1.0 - finite_or(stability, 100.0).clamp(0.0, 100.0) / 100.0).clamp(0.0, 1.0);
        Self {
            chaos,
            speed: SPEED_MIN + chaos.sqrt() * SPEED_CHAOS_GAIN,
            amplitude: AMPLITUDE_MIN + chaos * AMPLITUDE_CHAOS_GAIN,
        }
    }

    /// Largest amplitude multiplier any stability value can produce
    pub const fn max_amplitude() -> f32 {
        AMPLITUDE_MIN + AMPLITUDE_CHAOS_GAIN
    }
}

impl Default for DynamicsProfile {
    fn default() -> Self {
        Self::from_stability(100.0)
    }
}

/// A single light orb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orb {
    pub position: Vec2,
    /// Residual drift, integrated only while no interaction target is active
    pub velocity: Vec2,
    pub radius: f32,
    /// Index into the renderer's palette
    pub color_index: u32,
    /// Per-orb phase shift so orbs never move in lockstep
    pub phase_offset: f32,
}

/// Renderable orb state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbSnapshot {
    pub position: Vec2,
    pub radius: f32,
    pub color_index: u32,
}

impl From<&Orb> for OrbSnapshot {
    fn from(orb: &Orb) -> Self {
        Self {
            position: orb.position,
            radius: orb.radius,
            color_index: orb.color_index,
        }
    }
}

/// Control signal read by the cluster each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbInput {
    /// Psychological stability in [0, 100]
    pub stability: f32,
    pub interaction_active: bool,
    pub target_point: Vec2,
}

impl Default for OrbInput {
    fn default() -> Self {
        Self {
            stability: 100.0,
            interaction_active: false,
            target_point: Vec2::ZERO,
        }
    }
}

/// The orb cluster simulator
#[derive(Debug, Clone)]
pub struct OrbCluster {
    settings: OrbSettings,
    orbs: Vec<Orb>,
    canvas: Vec2,
    /// Global oscillation phase (radians)
    phase: f32,
    /// Last accepted stability value
    stability: f32,
    profile: DynamicsProfile,
    rng: Pcg32,
    snapshot: Vec<OrbSnapshot>,
}

impl OrbCluster {
    pub fn new(settings: OrbSettings, rng_state: RngState) -> Self {
        Self {
            settings,
            orbs: Vec::with_capacity(settings.count),
            canvas: Vec2::ZERO,
            phase: 0.0,
            stability: 100.0,
            profile: DynamicsProfile::default(),
            rng: rng_state.to_rng(),
            snapshot: Vec::with_capacity(settings.count),
        }
    }

    /// Place every orb at the canvas center. No-op once the orbs exist.
    pub fn setup(&mut self, canvas: Vec2) {
        if !self.orbs.is_empty() {
            return;
        }

        self.canvas = safe_canvas(canvas);
        let center = self.center();
        // Keep spawn offsets inside the canvas even for tiny surfaces
        let spawn = (self.canvas * 0.25).min(Vec2::splat(ORB_SPAWN_JITTER));
        let swing = self.settings.radius_swing * AMPLITUDE_MIN;

        for i in 0..self.settings.count {
            let orb = Orb {
                position: center + rng::square(&mut self.rng, spawn),
                velocity: rng::unit(&mut self.rng)
                    * rng::range(&mut self.rng, 0.0, ORB_INITIAL_SPEED),
                radius: self.settings.base_radius + rng::range(&mut self.rng, -swing, swing),
                color_index: i as u32,
                phase_offset: rng::range(&mut self.rng, 0.0, std::f32::consts::TAU),
            };
            self.orbs.push(orb);
        }

        log::debug!(
            "Orb cluster set up: {} orbs on {:.0}x{:.0} canvas",
            self.orbs.len(),
            self.canvas.x,
            self.canvas.y
        );
        self.publish();
    }

    /// Record a new canvas size without disturbing the animation
    pub fn resize(&mut self, canvas: Vec2) {
        self.canvas = safe_canvas(canvas);
    }

    /// Advance the cluster by `dt` seconds and publish a new snapshot
    pub fn update(&mut self, dt: f32, input: &OrbInput) -> &[OrbSnapshot] {
        if self.orbs.is_empty() || self.settings.mode == OrbMode::Frozen {
            return &self.snapshot;
        }

        let dt = sanitize_dt(dt);
        if input.stability.is_finite() {
            self.stability = input.stability.clamp(0.0, 100.0);
        }
        self.profile = DynamicsProfile::from_stability(self.stability);

        self.phase += dt * ORB_PHASE_RATE * self.profile.speed;

        let center = self.center();
        let active = input.interaction_active && input.target_point.is_finite();
        let (seek, pull) = if active {
            (input.target_point, self.settings.interact_pull)
        } else {
            (center, self.settings.idle_pull)
        };
        let k = (pull * dt * REFERENCE_FPS).clamp(0.0, 1.0);
        let drift_keep = damping(ORB_DRIFT_DAMPING, dt);
        let wander_on = self.settings.mode == OrbMode::Fluid;
        let amplitude = self.profile.amplitude;
        let phase = self.phase;

        for orb in &mut self.orbs {
            let theta = phase + orb.phase_offset;

            let wander = if wander_on {
                Vec2::new(theta.sin(), (phase * 0.7 + orb.phase_offset * 1.3).cos())
                    * self.settings.wander_radius
                    * amplitude
            } else {
                Vec2::ZERO
            };

            let goal = seek + wander;
            orb.position += (goal - orb.position) * k;

            if !active {
                orb.position += orb.velocity * dt;
                orb.velocity *= drift_keep;
            }

            orb.position = finite_vec_or(orb.position, center);
            orb.velocity = finite_vec_or(orb.velocity, Vec2::ZERO);
            orb.radius = self.settings.base_radius + theta.sin() * self.settings.radius_swing * amplitude;
        }

        self.publish();
        &self.snapshot
    }

    fn publish(&mut self) {
        self.snapshot.clear();
        self.snapshot.extend(self.orbs.iter().map(OrbSnapshot::from));
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> &[OrbSnapshot] {
        &self.snapshot
    }

    pub fn orbs(&self) -> &[Orb] {
        &self.orbs
    }

    pub fn len(&self) -> usize {
        self.orbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orbs.is_empty()
    }

    pub fn is_setup(&self) -> bool {
        !self.orbs.is_empty()
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }

    pub fn center(&self) -> Vec2 {
        self.canvas * 0.5
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn profile(&self) -> DynamicsProfile {
        self.profile
    }

    pub fn mode(&self) -> OrbMode {
        self.settings.mode
    }

    pub fn set_mode(&mut self, mode: OrbMode) {
        if mode != self.settings.mode {
            log::debug!("Orb mode {:?} -> {:?}", self.settings.mode, mode);
            self.settings.mode = mode;
        }
    }
}
