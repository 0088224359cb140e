//! Simulation tuning and user preferences
//!
//! Loaded from JSON by the embedding app. Every numeric field is sanitized on
//! load so a hand-edited file can never push the simulation into NaN land.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::OrbMode;

/// Orb cluster tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbSettings {
    pub count: usize,
    pub base_radius: f32,
    pub radius_swing: f32,
    pub wander_radius: f32,
    pub interact_pull: f32,
    pub idle_pull: f32,
    pub mode: OrbMode,
}

impl Default for OrbSettings {
    fn default() -> Self {
        Self {
            count: ORB_COUNT,
            base_radius: ORB_BASE_RADIUS,
            radius_swing: ORB_RADIUS_SWING,
            wander_radius: ORB_WANDER_RADIUS,
            interact_pull: ORB_INTERACT_PULL,
            idle_pull: ORB_IDLE_PULL,
            mode: OrbMode::Fluid,
        }
    }
}

/// Particle game tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub count: usize,
    pub halo_radius: f32,
    pub orbit_radius: f32,
    pub orbit_angular_speed: f32,
    /// Seconds of orbiting before fusion
    pub orbit_duration: f32,
    pub fusion_distance: f32,
    pub orbit_easing: f32,
    pub fusion_easing: f32,
    pub capture_steadiness: f32,
    pub scatter_min_speed: f32,
    pub scatter_max_speed: f32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: PARTICLE_COUNT,
            halo_radius: HALO_RADIUS,
            orbit_radius: ORBIT_RADIUS,
            orbit_angular_speed: ORBIT_ANGULAR_SPEED,
            orbit_duration: ORBIT_DURATION,
            fusion_distance: FUSION_DISTANCE,
            orbit_easing: ORBIT_EASING,
            fusion_easing: FUSION_EASING,
            capture_steadiness: CAPTURE_STEADINESS,
            scatter_min_speed: SCATTER_MIN_SPEED,
            scatter_max_speed: SCATTER_MAX_SPEED,
        }
    }
}

/// Guided breathing pattern (seconds per phase)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathSettings {
    pub enabled: bool,
    pub inhale: f32,
    pub hold: f32,
    pub exhale: f32,
    pub rest: f32,
}

impl Default for BreathSettings {
    fn default() -> Self {
        // 4-7-8 breathing
        Self {
            enabled: true,
            inhale: 4.0,
            hold: 7.0,
            exhale: 8.0,
            rest: 0.0,
        }
    }
}

/// Haptic and audio preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub haptics: bool,
    /// Multiplier applied to the instability-derived haptic intensity (0.0 - 1.0)
    pub haptic_scale: f32,
    /// Intensity changes smaller than this are not forwarded
    pub haptic_min_delta: f32,
    pub sound: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Cue volume (0.0 - 1.0)
    pub cue_volume: f32,
    pub breath_cues: bool,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            haptics: true,
            haptic_scale: 1.0,
            haptic_min_delta: 0.05,
            sound: true,
            master_volume: 0.8,
            cue_volume: 1.0,
            breath_cues: true,
        }
    }
}

/// All simulation settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run seed for reproducibility
    pub seed: u64,
    pub orbs: OrbSettings,
    pub particles: ParticleSettings,
    pub breath: BreathSettings,
    pub feedback: FeedbackSettings,

    // === Accessibility ===
    /// Reduced motion (orbs follow the target without wander jitter)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            orbs: OrbSettings::default(),
            particles: ParticleSettings::default(),
            breath: BreathSettings::default(),
            feedback: FeedbackSettings::default(),
            reduced_motion: false,
        }
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

fn unit_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { fallback }
}

fn count_or(value: usize, max: usize, fallback: usize) -> usize {
    if (1..=max).contains(&value) { value } else { fallback }
}

impl Settings {
    /// Effective orb mode (respects reduced_motion)
    pub fn effective_orb_mode(&self) -> OrbMode {
        match self.orbs.mode {
            OrbMode::Fluid if self.reduced_motion => OrbMode::Static,
            mode => mode,
        }
    }

    /// Effective haptic scale (0 when haptics are off)
    pub fn effective_haptic_scale(&self) -> f32 {
        if self.feedback.haptics {
            self.feedback.haptic_scale
        } else {
            0.0
        }
    }

    /// Replace out-of-range or non-finite values with defaults
    pub fn sanitized(mut self) -> Self {
        let o = OrbSettings::default();
        self.orbs.count = count_or(self.orbs.count, MAX_ORB_COUNT, o.count);
        self.orbs.base_radius = positive_or(self.orbs.base_radius, o.base_radius);
        self.orbs.radius_swing = if self.orbs.radius_swing.is_finite() {
            self.orbs.radius_swing.clamp(0.0, self.orbs.base_radius * 0.5)
        } else {
            o.radius_swing
        };
        self.orbs.wander_radius = positive_or(self.orbs.wander_radius, o.wander_radius);
        self.orbs.interact_pull = unit_or(self.orbs.interact_pull, o.interact_pull);
        self.orbs.idle_pull = unit_or(self.orbs.idle_pull, o.idle_pull);

        let p = ParticleSettings::default();
        let ps = &mut self.particles;
        ps.count = count_or(ps.count, MAX_PARTICLE_COUNT, p.count);
        ps.halo_radius = positive_or(ps.halo_radius, p.halo_radius);
        ps.orbit_radius = positive_or(ps.orbit_radius, p.orbit_radius);
        ps.orbit_angular_speed = if ps.orbit_angular_speed.is_finite() {
            ps.orbit_angular_speed
        } else {
            p.orbit_angular_speed
        };
        ps.orbit_duration = positive_or(ps.orbit_duration, p.orbit_duration);
        ps.fusion_distance = positive_or(ps.fusion_distance, p.fusion_distance);
        // Easing of 0 would freeze a particle forever
        ps.orbit_easing = positive_or(ps.orbit_easing, p.orbit_easing).min(1.0);
        ps.fusion_easing = positive_or(ps.fusion_easing, p.fusion_easing).min(1.0);
        ps.capture_steadiness = unit_or(ps.capture_steadiness, p.capture_steadiness);
        ps.scatter_min_speed = positive_or(ps.scatter_min_speed, p.scatter_min_speed);
        ps.scatter_max_speed =
            positive_or(ps.scatter_max_speed, p.scatter_max_speed).max(ps.scatter_min_speed);

        let f = FeedbackSettings::default();
        let fs = &mut self.feedback;
        fs.haptic_scale = unit_or(fs.haptic_scale, f.haptic_scale);
        fs.haptic_min_delta = unit_or(fs.haptic_min_delta, f.haptic_min_delta);
        fs.master_volume = unit_or(fs.master_volume, f.master_volume);
        fs.cue_volume = unit_or(fs.cue_volume, f.cue_volume);

        self
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Settings>(json).map(Settings::sanitized)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings at {} ({}) - using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
