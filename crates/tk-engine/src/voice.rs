//! ModulatorVoice: one sine oscillator gated by a triangular depth envelope.

use core::f64::consts::PI;

use crate::envelope::{EnvelopeStage, EnvelopeState};
use crate::event::VoiceId;
use crate::phase::wrap_phase;

/// A modulator slot. Four of these feed the carrier's frequency.
#[derive(Clone, Debug)]
pub struct ModulatorVoice {
    id: VoiceId,
    frequency_hz: f64,
    /// Current oscillator phase, always in `[0, 2π)`.
    phase: f64,
    /// `π·f/sample_rate`: the modulator sweeps half a turn per period of `f`.
    phase_increment: f64,
    sample_rate: f64,
    envelope: EnvelopeState,
}

impl ModulatorVoice {
    /// Create an idle voice whose envelope peaks at `modulation_target`.
    pub fn new(id: VoiceId, modulation_target: f64) -> Self {
        Self {
            id,
            frequency_hz: 0.0,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate: 0.0,
            envelope: EnvelopeState::new(modulation_target),
        }
    }

    /// Adopt a sample rate: zero the phase, idle the envelope and
    /// re-derive the increment from the last frequency.
    pub fn prepare(&mut self, sample_rate: f64, modulation_target: f64) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
        self.phase_increment = PI * self.frequency_hz / sample_rate;
        self.envelope = EnvelopeState::new(modulation_target);
    }

    /// Start a new modulation sweep. Replaces any sweep in progress.
    ///
    /// The oscillator phase carries over. Ignored before `prepare`.
    pub fn trigger(&mut self, frequency_hz: f64, ramp_seconds: f64) {
        if self.sample_rate <= 0.0 {
            return;
        }
        self.frequency_hz = frequency_hz;
        self.phase_increment = PI * frequency_hz / self.sample_rate;
        self.envelope.trigger(self.sample_rate, ramp_seconds);
    }

    /// Advance one sample and return this voice's contribution to the
    /// carrier's modulation sum (`envelope × sin(phase)`).
    #[inline]
    pub fn advance(&mut self) -> f64 {
        let depth = self.envelope.advance();
        let sample = libm::sin(self.phase);
        self.phase = wrap_phase(self.phase + self.phase_increment);
        depth * sample
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn phase_increment(&self) -> f64 {
        self.phase_increment
    }

    pub fn envelope(&self) -> &EnvelopeState {
        &self.envelope
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    /// Whether the last sweep has finished.
    pub fn is_completed(&self) -> bool {
        self.envelope.is_completed()
    }
}
