//! Guided breathing cycle
//!
//! Inhale, hold, exhale and rest phases advanced by the frame clock instead of
//! chained timers. Zero-length phases are skipped.

use serde::{Deserialize, Serialize};

use crate::sanitize_dt;
use crate::settings::BreathSettings;

/// Breathing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
    Rest,
}

impl BreathPhase {
    pub fn next(self) -> Self {
        match self {
            BreathPhase::Inhale => BreathPhase::Hold,
            BreathPhase::Hold => BreathPhase::Exhale,
            BreathPhase::Exhale => BreathPhase::Rest,
            BreathPhase::Rest => BreathPhase::Inhale,
        }
    }
}

/// Renderable breathing state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathSnapshot {
    pub phase: BreathPhase,
    /// Progress through the current phase, 0..1
    pub progress: f32,
    /// Lung fill level, 0 (empty) .. 1 (full)
    pub fill: f32,
    pub cycles: u32,
}

/// Breathing cycle state machine
#[derive(Debug, Clone)]
pub struct BreathCycle {
    settings: BreathSettings,
    phase: BreathPhase,
    elapsed: f32,
    cycles: u32,
}

impl BreathCycle {
    pub fn new(settings: BreathSettings) -> Self {
        let mut cycle = Self {
            settings,
            phase: BreathPhase::Inhale,
            elapsed: 0.0,
            cycles: 0,
        };
        cycle.skip_empty_phases();
        cycle
    }

    fn duration(&self, phase: BreathPhase) -> f32 {
        let d = match phase {
            BreathPhase::Inhale => self.settings.inhale,
            BreathPhase::Hold => self.settings.hold,
            BreathPhase::Exhale => self.settings.exhale,
            BreathPhase::Rest => self.settings.rest,
        };
        if d.is_finite() { d.max(0.0) } else { 0.0 }
    }

    fn total(&self) -> f32 {
        [
            BreathPhase::Inhale,
            BreathPhase::Hold,
            BreathPhase::Exhale,
            BreathPhase::Rest,
        ]
        .into_iter()
        .map(|phase| self.duration(phase))
        .sum()
    }

    /// Move forward until the current phase has a non-zero length
    fn skip_empty_phases(&mut self) {
        if !(self.total() > 0.0) {
            return;
        }
        while self.duration(self.phase) <= 0.0 {
            self.enter(self.phase.next());
        }
    }

    fn enter(&mut self, phase: BreathPhase) {
        if phase == BreathPhase::Inhale {
            self.cycles += 1;
        }
        self.phase = phase;
    }

    /// Advance by `dt`; returns the phase entered last if a boundary was crossed
    pub fn advance(&mut self, dt: f32) -> Option<BreathPhase> {
        if !self.settings.enabled || !(self.total() > 0.0) {
            return None;
        }

        self.elapsed += sanitize_dt(dt);
        let mut entered = None;
        while self.elapsed >= self.duration(self.phase) {
            self.elapsed -= self.duration(self.phase);
            self.enter(self.phase.next());
            self.skip_empty_phases();
            entered = Some(self.phase);
        }
        entered
    }

    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    pub fn progress(&self) -> f32 {
        let d = self.duration(self.phase);
        if d > 0.0 {
            (self.elapsed / d).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> BreathSnapshot {
        let progress = self.progress();
        let fill = match self.phase {
            BreathPhase::Inhale => progress,
            BreathPhase::Hold => 1.0,
            BreathPhase::Exhale => 1.0 - progress,
            BreathPhase::Rest => 0.0,
        };
        BreathSnapshot {
            phase: self.phase,
            progress,
            fill,
            cycles: self.cycles,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
    }
}
