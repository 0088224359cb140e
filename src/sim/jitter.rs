//! Session-local touch jitter measure
//!
//! Not to be confused with the global psychological stability scalar that
//! drives the orb cluster: this one only looks at how much the finger moved
//! between two ticks.

use glam::Vec2;

use crate::consts::{JITTER_DECAY, JITTER_RISE, JITTER_THRESHOLD};
use crate::damping;

/// Tracks local instability in [0, 1] from consecutive interaction points
#[derive(Debug, Clone, Default)]
pub struct JitterMeter {
    previous: Option<Vec2>,
    instability: f32,
}

impl JitterMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's interaction point; returns the updated instability
    pub fn update(&mut self, active: bool, point: Vec2, dt: f32) -> f32 {
        let point = active.then_some(point).filter(|p| p.is_finite());

        let jittery = match (self.previous, point) {
            (Some(prev), Some(now)) => prev.distance(now) > JITTER_THRESHOLD,
            _ => false,
        };

        if jittery {
            self.instability += JITTER_RISE * dt * crate::consts::REFERENCE_FPS;
        } else {
            self.instability *= damping(JITTER_DECAY, dt);
        }
        self.instability = self.instability.clamp(0.0, 1.0);
        self.previous = point;
        self.instability
    }

    /// Local instability in [0, 1]
    pub fn instability(&self) -> f32 {
        self.instability
    }

    /// Steadiness of the touch, `1 - instability`
    pub fn steadiness(&self) -> f32 {
        1.0 - self.instability
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
