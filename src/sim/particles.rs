//! Particle capture and fusion mini-game
//!
//! A fixed population of particles the user "tames" by holding a finger near
//! them. Each particle runs its own small state machine:
//!
//! ```text
//! Chaotic --(steady touch within halo)--> Orbiting --(orbit time elapsed)--> Fusing --(reached target)--> consumed
//!    ^                                        |                                 |
//!    +---------------- release (scatter) -----+---------------------------------+
//! ```
//!
//! Consumption is the only way a particle leaves the population, so
//! `chaotic + orbiting + fusing + fused == population` holds after every tick.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::jitter::JitterMeter;
use super::rng::{self, RngState};
use crate::consts::*;
use crate::settings::ParticleSettings;
use crate::{
    bearing, damping, direction_or, ease_factor, finite_vec_or, lerp, normalize_angle,
    polar_to_cartesian, safe_canvas, sanitize_dt,
};

/// Fixed particle palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleColor {
    Gold,
    Coral,
    Lavender,
    Aqua,
}

impl ParticleColor {
    pub const ALL: [ParticleColor; 4] = [
        ParticleColor::Gold,
        ParticleColor::Coral,
        ParticleColor::Lavender,
        ParticleColor::Aqua,
    ];
}

/// Per-particle state; orbit bookkeeping only exists while orbiting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticleState {
    /// Free-floating random walk
    Chaotic,
    /// Captured, circling the target on a fixed ring
    Orbiting { angle: f32, time: f32 },
    /// Collapsing into the target
    Fusing,
}

impl ParticleState {
    pub fn tag(&self) -> ParticleStateTag {
        match self {
            ParticleState::Chaotic => ParticleStateTag::Chaotic,
            ParticleState::Orbiting { .. } => ParticleStateTag::Orbiting,
            ParticleState::Fusing => ParticleStateTag::Fusing,
        }
    }
}

/// Data-free state discriminant for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleStateTag {
    Chaotic,
    Orbiting,
    Fusing,
}

/// A particle entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: ParticleColor,
    pub state: ParticleState,
}

/// Renderable particle state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub id: u32,
    pub position: Vec2,
    pub state: ParticleStateTag,
    pub color: ParticleColor,
}

impl From<&Particle> for ParticleSnapshot {
    fn from(p: &Particle) -> Self {
        Self {
            id: p.id,
            position: p.position,
            state: p.state.tag(),
            color: p.color,
        }
    }
}

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticleInput {
    pub interaction_active: bool,
    pub target_point: Vec2,
    /// One-shot: scatter every captured particle before integrating
    pub release: bool,
}

/// Things that happened during a tick, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleEvent {
    Captured { id: u32 },
    FusionStarted { id: u32 },
    /// `total` is the fused count after this fusion
    Fused { id: u32, total: usize },
    Released { count: usize },
    SessionComplete,
}

/// Population breakdown by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub chaotic: usize,
    pub orbiting: usize,
    pub fusing: usize,
    pub fused: usize,
}

impl Census {
    pub fn total(&self) -> usize {
        self.chaotic + self.orbiting + self.fusing + self.fused
    }
}

/// What happened to one particle during its step
enum Transition {
    Stay,
    Captured,
    FusionStarted,
    Consumed,
}

/// Per-tick values shared by every particle step
struct StepContext<'a> {
    settings: &'a ParticleSettings,
    dt: f32,
    target: Vec2,
    can_capture: bool,
    canvas: Vec2,
}

/// The particle population and its state machine
#[derive(Debug, Clone)]
pub struct ParticleField {
    settings: ParticleSettings,
    particles: Vec<Particle>,
    canvas: Vec2,
    population: usize,
    fused_count: usize,
    jitter: JitterMeter,
    complete: bool,
    rng: Pcg32,
    snapshot: Vec<ParticleSnapshot>,
}

impl ParticleField {
    /// Spawn the full population at random positions across the canvas
    pub fn new(settings: ParticleSettings, canvas: Vec2, rng_state: RngState) -> Self {
        let canvas = safe_canvas(canvas);
        let mut rng = rng_state.to_rng();
        let half = canvas * 0.5;

        let particles: Vec<Particle> = (0..settings.count)
            .map(|i| Particle {
                id: i as u32,
                position: half + rng::square(&mut rng, half),
                velocity: rng::unit(&mut rng) * rng::range(&mut rng, 0.0, WANDER_SPAWN_SPEED),
                color: ParticleColor::ALL[rng.random_range(0..ParticleColor::ALL.len())],
                state: ParticleState::Chaotic,
            })
            .collect();

        log::debug!(
            "Particle field spawned {} particles on {:.0}x{:.0} canvas",
            particles.len(),
            canvas.x,
            canvas.y
        );

        let mut field = Self {
            settings,
            population: particles.len(),
            particles,
            canvas,
            fused_count: 0,
            jitter: JitterMeter::new(),
            complete: false,
            rng,
            snapshot: Vec::with_capacity(settings.count),
        };
        field.publish();
        field
    }

    pub fn resize(&mut self, canvas: Vec2) {
        self.canvas = safe_canvas(canvas);
    }

    /// Advance every live particle by `dt` seconds
    pub fn tick(&mut self, dt: f32, input: &ParticleInput) -> Vec<ParticleEvent> {
        let mut events = Vec::new();
        if self.complete {
            return events;
        }

        let dt = sanitize_dt(dt);
        let target = finite_vec_or(input.target_point, self.canvas * 0.5);

        if input.release {
            let count = self.release(target);
            if count > 0 {
                events.push(ParticleEvent::Released { count });
            }
            // The next touch is judged on its own
            self.jitter.reset();
        }

        self.jitter.update(input.interaction_active, target, dt);

        let ctx = StepContext {
            settings: &self.settings,
            dt,
            target,
            // A release and a new capture never happen in the same tick
            can_capture: input.interaction_active
                && !input.release
                && self.jitter.steadiness() > self.settings.capture_steadiness,
            canvas: self.canvas,
        };
        let rng = &mut self.rng;
        let fused_count = &mut self.fused_count;

        self.particles.retain_mut(|p| match step(p, &ctx, rng) {
            Transition::Stay => true,
            Transition::Captured => {
                events.push(ParticleEvent::Captured { id: p.id });
                true
            }
            Transition::FusionStarted => {
                events.push(ParticleEvent::FusionStarted { id: p.id });
                true
            }
            Transition::Consumed => {
                *fused_count += 1;
                events.push(ParticleEvent::Fused {
                    id: p.id,
                    total: *fused_count,
                });
                false
            }
        });

        debug_assert_eq!(
            self.census().total(),
            self.population,
            "particle population not conserved"
        );

        if self.particles.is_empty() && self.fused_count == self.population {
            self.complete = true;
            events.push(ParticleEvent::SessionComplete);
            log::info!("Focus session complete: {} particles fused", self.fused_count);
        }

        self.publish();
        events
    }

    /// Scatter every captured particle away from `target`; returns how many were released
    pub fn release(&mut self, target: Vec2) -> usize {
        if self.complete {
            return 0;
        }

        let target = finite_vec_or(target, self.canvas * 0.5);
        let mut count = 0;
        for p in &mut self.particles {
            if p.state == ParticleState::Chaotic {
                continue;
            }
            let dir = direction_or(p.position - target, Vec2::X);
            let speed = rng::range(
                &mut self.rng,
                self.settings.scatter_min_speed,
                self.settings.scatter_max_speed,
            );
            p.velocity = dir * speed;
            p.state = ParticleState::Chaotic;
            count += 1;
        }

        if count > 0 {
            log::debug!("Released {} captured particles", count);
            self.publish();
        }
        count
    }

    fn publish(&mut self) {
        self.snapshot.clear();
        self.snapshot
            .extend(self.particles.iter().map(ParticleSnapshot::from));
    }

    /// Latest published snapshot, in stable id order
    pub fn snapshot(&self) -> &[ParticleSnapshot] {
        &self.snapshot
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn census(&self) -> Census {
        let mut census = Census {
            fused: self.fused_count,
            ..Census::default()
        };
        for p in &self.particles {
            match p.state.tag() {
                ParticleStateTag::Chaotic => census.chaotic += 1,
                ParticleStateTag::Orbiting => census.orbiting += 1,
                ParticleStateTag::Fusing => census.fusing += 1,
            }
        }
        census
    }

    pub fn population(&self) -> usize {
        self.population
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    pub fn fused_count(&self) -> usize {
        self.fused_count
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Session-local touch jitter in [0, 1], for haptic intensity
    pub fn local_instability(&self) -> f32 {
        self.jitter.instability()
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }
}

/// Run one particle's state machine for one tick
fn step(p: &mut Particle, ctx: &StepContext, rng: &mut Pcg32) -> Transition {
    let s = ctx.settings;
    match p.state {
        ParticleState::Chaotic => {
            if ctx.can_capture && p.position.distance(ctx.target) < s.halo_radius {
                p.state = ParticleState::Orbiting {
                    angle: bearing(ctx.target, p.position),
                    time: 0.0,
                };
                p.velocity = Vec2::ZERO;
                return Transition::Captured;
            }

            wander(p, ctx, rng);
            Transition::Stay
        }

        ParticleState::Orbiting { angle, time } => {
            let time = time + ctx.dt;
            let angle = normalize_angle(angle + s.orbit_angular_speed * ctx.dt);
            let ring = ctx.target + polar_to_cartesian(s.orbit_radius, angle);
            p.position = lerp(p.position, ring, ease_factor(s.orbit_easing, ctx.dt));

            if time >= s.orbit_duration {
                p.state = ParticleState::Fusing;
                Transition::FusionStarted
            } else {
                p.state = ParticleState::Orbiting { angle, time };
                Transition::Stay
            }
        }

        ParticleState::Fusing => {
            p.position = lerp(p.position, ctx.target, ease_factor(s.fusion_easing, ctx.dt));
            if p.position.distance(ctx.target) < s.fusion_distance {
                Transition::Consumed
            } else {
                Transition::Stay
            }
        }
    }
}

/// Bounded random walk with edge bounce
fn wander(p: &mut Particle, ctx: &StepContext, rng: &mut Pcg32) {
    let dt = ctx.dt;
    let kick = rng::unit(rng) * rng::range(rng, 0.0, WANDER_ACCEL) * dt;
    let max_speed = ctx.settings.scatter_max_speed.max(WANDER_SPAWN_SPEED);

    p.velocity = ((p.velocity + kick) * damping(WANDER_DAMPING, dt)).clamp_length_max(max_speed);
    p.velocity = finite_vec_or(p.velocity, Vec2::ZERO);
    p.position = finite_vec_or(p.position + p.velocity * dt, ctx.canvas * 0.5);

    if p.position.x < 0.0 {
        p.position.x = 0.0;
        p.velocity.x = p.velocity.x.abs();
    } else if p.position.x > ctx.canvas.x {
        p.position.x = ctx.canvas.x;
        p.velocity.x = -p.velocity.x.abs();
    }
    if p.position.y < 0.0 {
        p.position.y = 0.0;
        p.velocity.y = p.velocity.y.abs();
    } else if p.position.y > ctx.canvas.y {
        p.position.y = ctx.canvas.y;
        p.velocity.y = -p.velocity.y.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CANVAS: Vec2 = Vec2::new(400.0, 400.0);
    const TARGET: Vec2 = Vec2::new(200.0, 200.0);

    fn field(count: usize, seed: u64) -> ParticleField {
        let settings = ParticleSettings {
            count,
            ..ParticleSettings::default()
        };
        ParticleField::new(settings, CANVAS, RngState::new(seed))
    }

    fn hold(target: Vec2) -> ParticleInput {
        ParticleInput {
            interaction_active: true,
            target_point: target,
            release: false,
        }
    }

    fn lift(target: Vec2) -> ParticleInput {
        ParticleInput {
            interaction_active: false,
            target_point: target,
            release: true,
        }
    }

    #[test]
    fn test_spawn_full_chaotic_population() {
        let f = field(PARTICLE_COUNT, 1);
        let census = f.census();
        assert_eq!(census.chaotic, PARTICLE_COUNT);
        assert_eq!(census.total(), PARTICLE_COUNT);
        for p in f.particles() {
            assert!(p.position.cmpge(Vec2::ZERO).all() && p.position.cmple(CANVAS).all());
        }
        assert_eq!(f.snapshot().len(), PARTICLE_COUNT);
    }

    #[test]
    fn test_capture_to_fusion_timing() {
        let mut f = field(1, 2);
        f.particles[0].position = TARGET + Vec2::new(40.0, 0.0);

        let events = f.tick(NOMINAL_DT, &hold(TARGET));
        assert_eq!(events, vec![ParticleEvent::Captured { id: 0 }]);
        assert!(matches!(
            f.particles[0].state,
            ParticleState::Orbiting { time, .. } if time == 0.0
        ));

        let mut orbit_time = 0.0;
        loop {
            let events = f.tick(NOMINAL_DT, &hold(TARGET));
            orbit_time += NOMINAL_DT;
            if events.contains(&ParticleEvent::FusionStarted { id: 0 }) {
                break;
            }
            assert!(orbit_time < ORBIT_DURATION + NOMINAL_DT, "fusion never started");
        }
        assert!((orbit_time - ORBIT_DURATION).abs() <= NOMINAL_DT + 1e-4);
        // Orbit held the particle on the ring
        let ring_dist = f.particles[0].position.distance(TARGET);
        assert!((ring_dist - ORBIT_RADIUS).abs() < 10.0, "ring distance {}", ring_dist);

        let mut ticks = 0;
        let fused = loop {
            let events = f.tick(NOMINAL_DT, &hold(TARGET));
            ticks += 1;
            if let Some(e) = events
                .iter()
                .find(|e| matches!(e, ParticleEvent::Fused { .. }))
            {
                break *e;
            }
            assert_eq!(f.particles[0].state, ParticleState::Fusing);
            assert!(ticks < 120, "fusion never completed");
        };
        assert_eq!(fused, ParticleEvent::Fused { id: 0, total: 1 });
        assert_eq!(f.fused_count(), 1);
        assert_eq!(f.live_count(), 0);
        assert!(f.is_complete());
    }

    #[test]
    fn test_no_capture_outside_halo() {
        let mut f = field(1, 3);
        f.particles[0].position = Vec2::new(10.0, 10.0);
        f.particles[0].velocity = Vec2::ZERO;
        let events = f.tick(NOMINAL_DT, &hold(Vec2::new(390.0, 390.0)));
        assert!(events.is_empty());
        assert_eq!(f.census().chaotic, 1);
    }

    #[test]
    fn test_no_capture_without_interaction() {
        let mut f = field(1, 4);
        f.particles[0].position = TARGET;
        let input = ParticleInput {
            interaction_active: false,
            target_point: TARGET,
            release: false,
        };
        f.tick(NOMINAL_DT, &input);
        assert_eq!(f.census().chaotic, 1);
    }

    #[test]
    fn test_shaky_touch_blocks_capture() {
        let mut f = field(1, 5);
        f.particles[0].position = Vec2::new(5.0, 5.0);
        f.particles[0].velocity = Vec2::ZERO;

        // Jitter far away until instability saturates
        for i in 0..60 {
            let x = if i % 2 == 0 { 300.0 } else { 340.0 };
            f.tick(NOMINAL_DT, &hold(Vec2::new(x, 350.0)));
        }
        assert!(f.local_instability() > 0.9);

        // Keep jittering right on top of the particle
        let p = f.particles[0].position;
        let events = f.tick(NOMINAL_DT, &hold(p + Vec2::new(20.0, 0.0)));
        assert!(events.is_empty());
        assert_eq!(f.census().chaotic, 1);
    }

    #[test]
    fn test_release_clears_touch_jitter() {
        let mut f = field(1, 5);
        for i in 0..60 {
            let x = if i % 2 == 0 { 300.0 } else { 340.0 };
            f.tick(NOMINAL_DT, &hold(Vec2::new(x, 350.0)));
        }
        assert!(f.local_instability() > 0.9);

        f.tick(
            NOMINAL_DT,
            &ParticleInput {
                interaction_active: false,
                target_point: Vec2::new(340.0, 350.0),
                release: true,
            },
        );
        assert_eq!(f.local_instability(), 0.0);
    }

    #[test]
    fn test_orbiting_survives_lifted_finger_without_release() {
        let mut f = field(1, 6);
        f.particles[0].position = TARGET + Vec2::new(0.0, 30.0);
        f.tick(NOMINAL_DT, &hold(TARGET));
        let idle = ParticleInput {
            interaction_active: false,
            target_point: TARGET,
            release: false,
        };
        f.tick(NOMINAL_DT, &idle);
        assert_eq!(f.census().orbiting, 1);
    }

    #[test]
    fn test_release_scatters_outward() {
        let mut f = field(8, 7);
        for (i, p) in f.particles.iter_mut().enumerate() {
            p.position = TARGET + polar_to_cartesian(30.0, i as f32);
        }
        let events = f.tick(NOMINAL_DT, &hold(TARGET));
        assert_eq!(events.len(), 8);
        // Push half of them into fusion
        for p in f.particles.iter_mut().take(4) {
            p.state = ParticleState::Fusing;
        }

        let events = f.tick(NOMINAL_DT, &lift(TARGET));
        assert_eq!(events[0], ParticleEvent::Released { count: 8 });
        assert_eq!(f.census().chaotic, 8);
        for p in f.particles() {
            // Velocity after the first wander step still points away from the target
            let away = p.position - TARGET;
            assert!(away.dot(p.velocity) >= 0.0);
            assert!(p.velocity.length() > SCATTER_MIN_SPEED * 0.5);
        }
    }

    #[test]
    fn test_release_direction_and_speed_band() {
        let mut f = field(6, 8);
        for (i, p) in f.particles.iter_mut().enumerate() {
            p.position = TARGET + polar_to_cartesian(45.0, i as f32 * 1.1);
            p.state = ParticleState::Orbiting { angle: 0.0, time: 1.0 };
        }
        assert_eq!(f.release(TARGET), 6);
        for p in f.particles() {
            let away = p.position - TARGET;
            assert!(away.dot(p.velocity) >= 0.0);
            let speed = p.velocity.length();
            assert!(speed >= SCATTER_MIN_SPEED - 1e-3 && speed <= SCATTER_MAX_SPEED + 1e-3);
            assert_eq!(p.state, ParticleState::Chaotic);
        }
        assert_eq!(f.census().total(), 6);
    }

    #[test]
    fn test_release_at_target_uses_fallback_direction() {
        let mut f = field(1, 9);
        f.particles[0].position = TARGET;
        f.particles[0].state = ParticleState::Fusing;
        f.release(TARGET);
        let v = f.particles[0].velocity;
        assert!(v.is_finite());
        assert!(v.y.abs() < 1e-5 && v.x > 0.0);
    }

    #[test]
    fn test_large_dt_is_capped() {
        let mut a = field(20, 10);
        let mut b = a.clone();
        let before: Vec<Vec2> = a.particles().iter().map(|p| p.position).collect();
        a.tick(10.0, &hold(TARGET));
        b.tick(MAX_DT, &hold(TARGET));
        assert_eq!(a.snapshot(), b.snapshot());
        let max_step = SCATTER_MAX_SPEED * MAX_DT + HALO_RADIUS;
        for (p, old) in a.particles().iter().zip(before) {
            assert!(p.position.is_finite());
            assert!(p.position.distance(old) <= max_step);
        }
    }

    #[test]
    fn test_full_session_completes_once() {
        let mut f = field(PARTICLE_COUNT, 11);
        let mut completions = 0;
        let mut last_fused = 0;
        for _ in 0..60 * 600 {
            for e in f.tick(NOMINAL_DT, &hold(TARGET)) {
                match e {
                    ParticleEvent::SessionComplete => completions += 1,
                    ParticleEvent::Fused { total, .. } => {
                        assert_eq!(total, last_fused + 1);
                        last_fused = total;
                    }
                    _ => {}
                }
            }
            if f.is_complete() {
                break;
            }
        }
        assert!(f.is_complete(), "only {} fused", f.fused_count());
        assert_eq!(f.fused_count(), PARTICLE_COUNT);

        // Terminal: nothing else happens
        for _ in 0..120 {
            assert!(f.tick(NOMINAL_DT, &hold(TARGET)).is_empty());
            assert!(f.tick(NOMINAL_DT, &lift(TARGET)).is_empty());
        }
        assert_eq!(completions, 1);
        assert_eq!(f.fused_count(), PARTICLE_COUNT);
        assert_eq!(f.census().total(), PARTICLE_COUNT);
    }

    #[test]
    fn test_degenerate_canvas_and_target() {
        let settings = ParticleSettings {
            count: 5,
            ..ParticleSettings::default()
        };
        let mut f = ParticleField::new(settings, Vec2::ZERO, RngState::new(12));
        let input = ParticleInput {
            interaction_active: true,
            target_point: Vec2::new(f32::NAN, 3.0),
            release: false,
        };
        for _ in 0..30 {
            f.tick(NOMINAL_DT, &input);
        }
        for p in f.particles() {
            assert!(p.position.is_finite());
        }
        assert_eq!(f.census().total(), 5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_population_conserved(
            seed in any::<u64>(),
            steps in prop::collection::vec(
                (0.0f32..0.3, any::<bool>(), 0.0f32..400.0, 0.0f32..400.0, prop::bool::weighted(0.05)),
                1..400,
            ),
        ) {
            let mut f = field(24, seed);
            let mut fused_events = 0;
            let mut last_fused = 0;
            for (dt, active, x, y, release) in steps {
                let input = ParticleInput {
                    interaction_active: active,
                    target_point: Vec2::new(x, y),
                    release,
                };
                for e in f.tick(dt, &input) {
                    if let ParticleEvent::Fused { total, .. } = e {
                        fused_events += 1;
                        prop_assert_eq!(total, fused_events);
                    }
                }
                let census = f.census();
                prop_assert_eq!(census.total(), 24);
                prop_assert!(f.fused_count() >= last_fused);
                prop_assert_eq!(f.fused_count(), fused_events);
                prop_assert_eq!(f.snapshot().len(), f.live_count());
                last_fused = f.fused_count();
            }
        }

        #[test]
        fn prop_release_points_away(seed in any::<u64>(), radius in 0.0f32..90.0) {
            let mut f = field(12, seed);
            for (i, p) in f.particles.iter_mut().enumerate() {
                p.position = TARGET + polar_to_cartesian(radius, i as f32 * 0.5);
                p.state = if i % 2 == 0 {
                    ParticleState::Fusing
                } else {
                    ParticleState::Orbiting { angle: 0.0, time: 0.5 }
                };
            }
            f.release(TARGET);
            for p in f.particles() {
                let away = p.position - TARGET;
                if away.length() >= DEGENERATE_DISTANCE {
                    prop_assert!(away.dot(p.velocity) >= 0.0);
                } else {
                    prop_assert!(p.velocity.x > 0.0);
                }
            }
        }
    }
}
