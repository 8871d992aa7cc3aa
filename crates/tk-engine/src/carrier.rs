//! Carrier oscillator with per-sample frequency modulation.

use core::f64::consts::TAU;

use crate::phase::wrap_phase;
use crate::scale;

/// Fixed output attenuation. Leaves headroom for the modulators summing
/// constructively.
pub const OUTPUT_GAIN: f64 = 0.5;

/// A phase-accumulated sine whose frequency is recomputed every sample.
#[derive(Clone, Debug)]
pub struct CarrierOscillator {
    base_frequency_hz: f64,
    /// Last instantaneous frequency (base + modulation, maybe quantized).
    instantaneous_hz: f64,
    /// Always in `[0, 2π)`.
    phase: f64,
    phase_increment: f64,
    sample_rate: f64,
}

impl CarrierOscillator {
    pub fn new(base_frequency_hz: f64) -> Self {
        Self {
            base_frequency_hz,
            instantaneous_hz: base_frequency_hz,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate: 0.0,
        }
    }

    /// Zero the phase and adopt a new sample rate.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
        self.instantaneous_hz = self.base_frequency_hz;
        self.phase_increment = TAU * self.base_frequency_hz / sample_rate;
    }

    pub fn set_base_frequency(&mut self, hz: f64) {
        self.base_frequency_hz = hz;
    }

    /// Produce one output sample, then advance the phase at
    /// `base + modulation_sum` Hz.
    ///
    /// The sign of the instantaneous frequency is not clamped; a negative
    /// frequency runs the phase backwards.
    #[inline]
    pub fn process(&mut self, modulation_sum: f64, quantize: bool) -> f64 {
        let mut freq = self.base_frequency_hz + modulation_sum;
        if quantize {
            freq = scale::quantize(freq as f32) as f64;
        }
        self.instantaneous_hz = freq;
        self.phase_increment = TAU * freq / self.sample_rate;

        let out = libm::sin(self.phase) * OUTPUT_GAIN;
        self.phase = wrap_phase(self.phase + self.phase_increment);
        out
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency_hz
    }

    pub fn instantaneous_frequency(&self) -> f64 {
        self.instantaneous_hz
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn phase_increment(&self) -> f64 {
        self.phase_increment
    }
}
