//! Haptic and audio feedback interfaces
//!
//! The simulation never talks to a platform sound or haptics engine directly.
//! The embedding app injects sinks; the mixer applies user preferences and
//! throttles continuous haptic updates before anything reaches them.

use crate::settings::FeedbackSettings;
use crate::sim::BreathPhase;

/// Discrete feedback cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// A particle was captured into orbit
    Capture,
    /// A particle started collapsing into the target
    FusionStart,
    /// A particle was consumed
    Fuse,
    /// Captured particles scattered after the finger lifted
    Release,
    /// Every particle fused
    SessionComplete,
    /// Breathing guidance entered a new phase
    Breath(BreathPhase),
}

impl Cue {
    /// Relative loudness/strength of the cue
    pub fn weight(self) -> f32 {
        match self {
            Cue::Capture => 0.4,
            Cue::FusionStart => 0.3,
            Cue::Fuse => 0.7,
            Cue::Release => 0.5,
            Cue::SessionComplete => 1.0,
            Cue::Breath(_) => 0.35,
        }
    }
}

/// Receives haptic output
pub trait HapticSink {
    /// Continuous intensity (0.0 - 1.0), derived from touch instability
    fn intensity(&mut self, level: f32);
    /// One-shot pulse for a discrete cue (0.0 - 1.0)
    fn pulse(&mut self, cue: Cue, strength: f32);
}

/// Receives audio cues
pub trait AudioSink {
    /// Play a cue at the given volume (0.0 - 1.0)
    fn play(&mut self, cue: Cue, volume: f32);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl HapticSink for NullSink {
    fn intensity(&mut self, _level: f32) {}
    fn pulse(&mut self, _cue: Cue, _strength: f32) {}
}

impl AudioSink for NullSink {
    fn play(&mut self, _cue: Cue, _volume: f32) {}
}

/// Applies feedback preferences in front of the injected sinks
pub struct FeedbackMixer {
    settings: FeedbackSettings,
    haptics: Box<dyn HapticSink>,
    audio: Box<dyn AudioSink>,
    muted: bool,
    /// Last intensity forwarded to the haptic sink
    last_intensity: f32,
}

impl FeedbackMixer {
    pub fn new(
        settings: FeedbackSettings,
        haptics: Box<dyn HapticSink>,
        audio: Box<dyn AudioSink>,
    ) -> Self {
        Self {
            settings,
            haptics,
            audio,
            muted: false,
            last_intensity: 0.0,
        }
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_settings(&mut self, settings: FeedbackSettings) {
        self.settings = settings;
    }

    /// Get effective volume
    fn effective_volume(&self) -> f32 {
        if self.muted || !self.settings.sound {
            0.0
        } else {
            self.settings.master_volume * self.settings.cue_volume
        }
    }

    /// Forward a continuous haptic level, skipping changes too small to feel
    pub fn intensity(&mut self, level: f32) {
        if !self.settings.haptics {
            return;
        }
        let level = (crate::finite_or(level, 0.0) * self.settings.haptic_scale).clamp(0.0, 1.0);
        let delta = (level - self.last_intensity).abs();
        // Always let the signal settle to exactly zero
        if delta >= self.settings.haptic_min_delta || (level == 0.0 && self.last_intensity > 0.0)
        {
            self.last_intensity = level;
            self.haptics.intensity(level);
        }
    }

    /// Dispatch a discrete cue to both sinks
    pub fn cue(&mut self, cue: Cue) {
        if matches!(cue, Cue::Breath(_)) && !self.settings.breath_cues {
            return;
        }

        let vol = self.effective_volume() * cue.weight();
        if vol > 0.0 {
            self.audio.play(cue, vol);
        }

        if self.settings.haptics {
            let strength = cue.weight() * self.settings.haptic_scale;
            if strength > 0.0 {
                self.haptics.pulse(cue, strength);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Everything a recording sink has seen
    #[derive(Debug, Default)]
    pub struct Recorded {
        pub intensities: Vec<f32>,
        pub pulses: Vec<(Cue, f32)>,
        pub sounds: Vec<(Cue, f32)>,
    }

    /// Test sink sharing its log with the test body
    #[derive(Clone, Default)]
    pub struct Recorder(pub Rc<RefCell<Recorded>>);

    impl HapticSink for Recorder {
        fn intensity(&mut self, level: f32) {
            self.0.borrow_mut().intensities.push(level);
        }
        fn pulse(&mut self, cue: Cue, strength: f32) {
            self.0.borrow_mut().pulses.push((cue, strength));
        }
    }

    impl AudioSink for Recorder {
        fn play(&mut self, cue: Cue, volume: f32) {
            self.0.borrow_mut().sounds.push((cue, volume));
        }
    }

    fn mixer(settings: FeedbackSettings) -> (FeedbackMixer, Recorder) {
        let rec = Recorder::default();
        let m = FeedbackMixer::new(settings, Box::new(rec.clone()), Box::new(rec.clone()));
        (m, rec)
    }

    #[test]
    fn test_cue_reaches_both_sinks() {
        let (mut m, rec) = mixer(FeedbackSettings::default());
        m.cue(Cue::Fuse);
        let r = rec.0.borrow();
        assert_eq!(r.sounds.len(), 1);
        assert!((r.sounds[0].1 - 0.8 * 0.7).abs() < 1e-5);
        assert_eq!(r.pulses, vec![(Cue::Fuse, 0.7)]);
    }

    #[test]
    fn test_mute_silences_audio_only() {
        let (mut m, rec) = mixer(FeedbackSettings::default());
        m.set_muted(true);
        m.cue(Cue::Capture);
        let r = rec.0.borrow();
        assert!(r.sounds.is_empty());
        assert_eq!(r.pulses.len(), 1);
    }

    #[test]
    fn test_haptics_disabled() {
        let (mut m, rec) = mixer(FeedbackSettings {
            haptics: false,
            ..FeedbackSettings::default()
        });
        m.intensity(0.9);
        m.cue(Cue::Release);
        let r = rec.0.borrow();
        assert!(r.intensities.is_empty());
        assert!(r.pulses.is_empty());
        assert_eq!(r.sounds.len(), 1);
    }

    #[test]
    fn test_intensity_throttling_and_settle() {
        let (mut m, rec) = mixer(FeedbackSettings::default());
        m.intensity(0.5);
        m.intensity(0.52); // below min delta
        m.intensity(0.7);
        m.intensity(0.02); // large drop
        m.intensity(0.0); // settles to zero even though the delta is tiny
        m.intensity(f32::NAN);
        assert_eq!(rec.0.borrow().intensities, vec![0.5, 0.7, 0.02, 0.0]);
    }

    #[test]
    fn test_breath_cues_can_be_disabled() {
        let (mut m, rec) = mixer(FeedbackSettings {
            breath_cues: false,
            ..FeedbackSettings::default()
        });
        m.cue(Cue::Breath(BreathPhase::Exhale));
        m.cue(Cue::SessionComplete);
        let r = rec.0.borrow();
        assert_eq!(r.sounds.len(), 1);
        assert_eq!(r.sounds[0].0, Cue::SessionComplete);
    }
}
