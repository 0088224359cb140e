//! Frame driver
//!
//! One authoritative clock, one input snapshot per tick, and a fixed order:
//! apply input, integrate, publish, then notify feedback sinks. The embedding
//! app calls [`Engine::frame`] once per rendered frame; pausing is simply not
//! calling it.

use glam::Vec2;

use crate::consts::NOMINAL_DT;
use crate::feedback::{AudioSink, Cue, FeedbackMixer, HapticSink};
use crate::settings::Settings;
use crate::sim::{
    BreathCycle, BreathPhase, BreathSnapshot, DynamicsProfile, OrbCluster, OrbInput, OrbSnapshot, ParticleEvent,
    ParticleField, ParticleInput, ParticleSnapshot, RngState,
};
use crate::{safe_canvas, sanitize_dt};

/// Turns host timestamps into capped, monotonic frame deltas
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
    frames: u64,
    elapsed: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta since the previous call, in seconds
    ///
    /// The first call (and any call after [`reset`](Self::reset)) yields the
    /// nominal 60 Hz step. Time running backwards yields zero.
    pub fn delta(&mut self, now_secs: f64) -> f32 {
        let dt = match self.last {
            Some(last) if now_secs.is_finite() => (now_secs - last).max(0.0) as f32,
            _ => NOMINAL_DT,
        };
        if now_secs.is_finite() {
            self.last = Some(self.last.map_or(now_secs, |last| last.max(now_secs)));
        }

        self.advance_by(dt)
    }

    /// Count a frame of an explicitly chosen length; returns the capped delta
    pub fn advance_by(&mut self, dt: f32) -> f32 {
        let dt = sanitize_dt(dt);
        self.frames += 1;
        self.elapsed += dt as f64;
        dt
    }

    /// Forget the last timestamp (after a pause or backgrounding)
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Simulated seconds handed out so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

/// Input snapshot used for one whole tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Psychological stability in [0, 100]
    pub stability: f32,
    pub interaction_active: bool,
    pub target_point: Vec2,
    /// New canvas size, if it changed since the last tick
    pub canvas_size: Option<Vec2>,
    /// One-shot: the finger lifted
    pub release: bool,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            stability: 100.0,
            interaction_active: false,
            target_point: Vec2::ZERO,
            canvas_size: None,
            release: false,
        }
    }
}

/// Collects host input events between ticks
///
/// Lives on whatever thread receives touch events; the host moves the result
/// of [`take`](Self::take) to the simulation before the tick starts.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    current: FrameInput,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch_began(&mut self, point: Vec2) {
        self.current.interaction_active = true;
        self.current.target_point = point;
    }

    pub fn touch_moved(&mut self, point: Vec2) {
        if self.current.interaction_active {
            self.current.target_point = point;
        }
    }

    pub fn touch_ended(&mut self) {
        if self.current.interaction_active {
            self.current.interaction_active = false;
            self.current.release = true;
        }
    }

    pub fn set_stability(&mut self, stability: f32) {
        self.current.stability = stability;
    }

    pub fn resize(&mut self, size: Vec2) {
        self.current.canvas_size = Some(size);
    }

    /// Snapshot for the next tick; clears one-shot inputs
    pub fn take(&mut self) -> FrameInput {
        let input = self.current;
        self.current.release = false;
        self.current.canvas_size = None;
        input
    }
}

/// Everything a renderer or UI needs after one tick
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub frame: u64,
    /// Simulated seconds since the engine started
    pub time: f64,
    pub orbs: Vec<OrbSnapshot>,
    pub profile: DynamicsProfile,
    pub particles: Vec<ParticleSnapshot>,
    /// Particle events raised during this tick, in order
    pub events: Vec<ParticleEvent>,
    pub fused_count: usize,
    pub population: usize,
    pub session_complete: bool,
    /// Session-local touch jitter in [0, 1]
    pub local_instability: f32,
    pub breath: Option<BreathSnapshot>,
}

/// Owns the simulators and sequences each frame
pub struct Engine {
    settings: Settings,
    rng: RngState,
    clock: FrameClock,
    orbs: OrbCluster,
    focus: Option<ParticleField>,
    /// A session was started before the first canvas arrived
    focus_pending: bool,
    sessions: u64,
    breath: BreathCycle,
    feedback: FeedbackMixer,
    canvas: Vec2,
    last_target: Vec2,
    snapshot: FrameSnapshot,
}

impl Engine {
    pub fn new(
        settings: Settings,
        haptics: Box<dyn HapticSink>,
        audio: Box<dyn AudioSink>,
    ) -> Self {
        let settings = settings.sanitized();
        let rng = RngState::new(settings.seed);
        let mut orb_settings = settings.orbs;
        orb_settings.mode = settings.effective_orb_mode();

        Self {
            orbs: OrbCluster::new(orb_settings, rng.with_stream(0)),
            focus: None,
            focus_pending: false,
            sessions: 0,
            breath: BreathCycle::new(settings.breath),
            feedback: FeedbackMixer::new(settings.feedback, haptics, audio),
            clock: FrameClock::new(),
            canvas: Vec2::ZERO,
            last_target: Vec2::ZERO,
            snapshot: FrameSnapshot::default(),
            rng,
            settings,
        }
    }

    /// Engine whose feedback goes nowhere
    pub fn silent(settings: Settings) -> Self {
        let feedback = crate::feedback::NullSink;
        Self::new(settings, Box::new(feedback), Box::new(feedback))
    }

    /// Lay out the orb cluster for a canvas. Safe to call on every layout pass.
    pub fn setup(&mut self, canvas: Vec2) {
        if self.orbs.is_setup() {
            self.resize(canvas);
            return;
        }
        self.canvas = safe_canvas(canvas);
        self.last_target = self.canvas * 0.5;
        self.orbs.setup(self.canvas);
        log::info!("Engine ready on {:.0}x{:.0} canvas", self.canvas.x, self.canvas.y);
        if self.focus_pending {
            self.spawn_focus_field();
        }
    }

    pub fn resize(&mut self, canvas: Vec2) {
        self.canvas = safe_canvas(canvas);
        self.orbs.resize(self.canvas);
        if let Some(field) = &mut self.focus {
            field.resize(self.canvas);
        }
    }

    /// Start a fresh focus-building session with a full particle population
    ///
    /// Before the first canvas arrives the particles are not spawned yet; the
    /// session starts on the next [`setup`](Self::setup).
    pub fn start_focus_session(&mut self) {
        self.sessions += 1;
        // Every session opens on an inhale
        self.breath.reset();
        if !self.orbs.is_setup() {
            log::debug!("Focus session {} waiting for a canvas", self.sessions);
            self.focus = None;
            self.focus_pending = true;
            return;
        }
        self.spawn_focus_field();
    }

    fn spawn_focus_field(&mut self) {
        self.focus_pending = false;
        let field = ParticleField::new(
            self.settings.particles,
            self.canvas,
            self.rng.with_stream(self.sessions),
        );
        log::info!(
            "Focus session {} started with {} particles",
            self.sessions,
            field.population()
        );
        self.focus = Some(field);
    }

    /// Drop the current focus session; returns how many particles were fused
    pub fn end_focus_session(&mut self) -> Option<usize> {
        if std::mem::take(&mut self.focus_pending) {
            log::info!("Focus session {} ended before it spawned", self.sessions);
            return Some(0);
        }
        let field = self.focus.take()?;
        log::info!(
            "Focus session {} ended: {}/{} fused",
            self.sessions,
            field.fused_count(),
            field.population()
        );
        self.feedback.intensity(0.0);
        Some(field.fused_count())
    }

    /// Tick using a host timestamp (seconds)
    pub fn frame(&mut self, now_secs: f64, input: &FrameInput) -> &FrameSnapshot {
        let dt = self.clock.delta(now_secs);
        self.advance(dt, input)
    }

    /// Tick by an explicit delta (seconds)
    pub fn step(&mut self, dt: f32, input: &FrameInput) -> &FrameSnapshot {
        let dt = self.clock.advance_by(dt);
        self.advance(dt, input)
    }

    fn advance(&mut self, dt: f32, input: &FrameInput) -> &FrameSnapshot {
        // Apply input
        if let Some(size) = input.canvas_size {
            self.setup(size);
        }
        let target = if input.target_point.is_finite() {
            input.target_point
        } else {
            self.last_target
        };
        if input.interaction_active {
            self.last_target = target;
        }

        // Integrate
        let orb_input = OrbInput {
            stability: input.stability,
            interaction_active: input.interaction_active,
            target_point: target,
        };
        self.orbs.update(dt, &orb_input);

        let events = match &mut self.focus {
            Some(field) => field.tick(
                dt,
                &ParticleInput {
                    interaction_active: input.interaction_active,
                    target_point: target,
                    release: input.release,
                },
            ),
            None => Vec::new(),
        };

        let breath_entered = self.breath.advance(dt);

        // Publish
        self.publish(events);

        // Notify collaborators
        self.dispatch_feedback(breath_entered, input.interaction_active);

        &self.snapshot
    }

    fn publish(&mut self, events: Vec<ParticleEvent>) {
        let s = &mut self.snapshot;
        s.frame = self.clock.frames();
        s.time = self.clock.elapsed();
        s.orbs.clear();
        s.orbs.extend_from_slice(self.orbs.snapshot());
        s.profile = self.orbs.profile();
        s.particles.clear();
        s.events = events;

        match &self.focus {
            Some(field) => {
                s.particles.extend_from_slice(field.snapshot());
                s.fused_count = field.fused_count();
                s.population = field.population();
                s.session_complete = field.is_complete();
                s.local_instability = field.local_instability();
            }
            None => {
                s.fused_count = 0;
                s.population = 0;
                s.session_complete = false;
                s.local_instability = 0.0;
            }
        }

        s.breath = self
            .settings
            .breath
            .enabled
            .then(|| self.breath.snapshot());
    }

    fn dispatch_feedback(&mut self, breath_entered: Option<BreathPhase>, touching: bool) {
        // One cue of each kind per frame, however many particles triggered it
        let mut cues: Vec<Cue> = Vec::new();
        for event in &self.snapshot.events {
            let cue = match event {
                ParticleEvent::Captured { .. } => Cue::Capture,
                ParticleEvent::FusionStarted { .. } => Cue::FusionStart,
                ParticleEvent::Fused { .. } => Cue::Fuse,
                ParticleEvent::Released { .. } => Cue::Release,
                ParticleEvent::SessionComplete => Cue::SessionComplete,
            };
            if !cues.contains(&cue) {
                cues.push(cue);
            }
        }
        if let Some(phase) = breath_entered {
            cues.push(Cue::Breath(phase));
        }
        for cue in cues {
            self.feedback.cue(cue);
        }

        if self.focus.is_some() {
            let level = if touching && !self.snapshot.session_complete {
                self.snapshot.local_instability
            } else {
                0.0
            };
            self.feedback.intensity(level);
        }
    }

    /// Forget the last frame timestamp so the next frame uses the nominal step
    pub fn resume(&mut self) {
        self.clock.reset();
    }

    /// Apply new preferences; particle tuning takes effect from the next session
    pub fn apply_settings(&mut self, settings: Settings) {
        let settings = settings.sanitized();
        self.orbs.set_mode(settings.effective_orb_mode());
        self.feedback.set_settings(settings.feedback);
        if settings.breath != self.settings.breath {
            self.breath = BreathCycle::new(settings.breath);
        }
        self.settings = settings;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.feedback.set_muted(muted);
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.snapshot
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn orbs(&self) -> &OrbCluster {
        &self.orbs
    }

    pub fn focus(&self) -> Option<&ParticleField> {
        self.focus.as_ref()
    }

    /// True while a started session waits for the first canvas
    pub fn is_focus_pending(&self) -> bool {
        self.focus_pending
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }
}
