//! Instance types for the orb and particle passes

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::sim::{OrbSnapshot, ParticleColor, ParticleSnapshot, ParticleStateTag};

/// One orb as drawn by the blur/additive pass
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OrbInstance {
    /// Center in normalized device coordinates
    pub center: [f32; 2],
    /// Radius in NDC units along x and y
    pub radius: [f32; 2],
    pub color: [f32; 4],
}

/// One particle sprite
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub center: [f32; 2],
    pub size: f32,
    /// Extra brightness for captured particles
    pub glow: f32,
    pub color: [f32; 4],
}

/// Colors for simulation elements
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    /// Orb colors, indexed by `color_index` (wraps)
    pub orbs: Vec<[f32; 4]>,
    pub gold: [f32; 4],
    pub coral: [f32; 4],
    pub lavender: [f32; 4],
    pub aqua: [f32; 4],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            orbs: vec![
                [0.55, 0.75, 1.0, 0.85],
                [0.70, 0.55, 1.0, 0.85],
                [0.45, 0.95, 0.90, 0.85],
                [1.0, 0.70, 0.85, 0.85],
                [0.95, 0.85, 0.55, 0.85],
                [0.60, 0.90, 0.65, 0.85],
            ],
            gold: [1.0, 0.82, 0.40, 1.0],
            coral: [1.0, 0.50, 0.45, 1.0],
            lavender: [0.75, 0.62, 1.0, 1.0],
            aqua: [0.40, 0.90, 0.95, 1.0],
        }
    }
}

impl Palette {
    pub fn orb(&self, index: u32) -> [f32; 4] {
        if self.orbs.is_empty() {
            return [1.0; 4];
        }
        self.orbs[index as usize % self.orbs.len()]
    }

    pub fn particle(&self, color: ParticleColor) -> [f32; 4] {
        match color {
            ParticleColor::Gold => self.gold,
            ParticleColor::Coral => self.coral,
            ParticleColor::Lavender => self.lavender,
            ParticleColor::Aqua => self.aqua,
        }
    }
}

/// Canvas point to NDC (y up)
fn to_ndc(p: Vec2, canvas: Vec2) -> [f32; 2] {
    let canvas = crate::safe_canvas(canvas);
    let n = p / canvas * 2.0 - Vec2::ONE;
    [n.x, -n.y]
}

/// Build orb instances in snapshot order
pub fn orb_instances(orbs: &[OrbSnapshot], canvas: Vec2, palette: &Palette) -> Vec<OrbInstance> {
    let scale = 2.0 / crate::safe_canvas(canvas);
    orbs.iter()
        .map(|o| OrbInstance {
            center: to_ndc(o.position, canvas),
            radius: (scale * o.radius).to_array(),
            color: palette.orb(o.color_index),
        })
        .collect()
}

/// Build particle instances in snapshot order
pub fn particle_instances(
    particles: &[ParticleSnapshot],
    canvas: Vec2,
    palette: &Palette,
    base_size: f32,
) -> Vec<ParticleInstance> {
    particles
        .iter()
        .map(|p| {
            let (size, glow) = match p.state {
                ParticleStateTag::Chaotic => (base_size, 0.0),
                ParticleStateTag::Orbiting => (base_size * 1.2, 0.5),
                ParticleStateTag::Fusing => (base_size * 0.8, 1.0),
            };
            ParticleInstance {
                center: to_ndc(p.position, canvas),
                size,
                glow,
                color: palette.particle(p.color),
            }
        })
        .collect()
}
