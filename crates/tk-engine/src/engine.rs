//! The synthesis engine: four modulators into one carrier.

use alloc::sync::Arc;

use crate::carrier::CarrierOscillator;
use crate::control::ControlPort;
use crate::error::EngineError;
use crate::event::{TriggerEvent, VoiceId, NUM_VOICES};
use crate::mapping::{self, TriggerMapping};
use crate::voice::ModulatorVoice;

/// Longest envelope ramp a trigger can request (seconds).
pub const MAX_RAMP_SECONDS: f64 = 10.0;

/// Envelope peak: the largest frequency deviation (Hz) one voice adds.
pub const MODULATION_TARGET: f64 = 1000.0;

/// Engine settings, fixed by `prepare`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub max_ramp_seconds: f64,
    pub modulation_target: f64,
    /// Snap the carrier's instantaneous frequency to the scale.
    pub quantize: bool,
    pub mapping: TriggerMapping,
}

impl EngineConfig {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            max_ramp_seconds: MAX_RAMP_SECONDS,
            modulation_target: MODULATION_TARGET,
            quantize: false,
            mapping: TriggerMapping::default(),
        }
    }

    pub fn with_quantize(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn with_mapping(mut self, mapping: TriggerMapping) -> Self {
        self.mapping = mapping;
        self
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
            Ok(())
        } else {
            Err(EngineError::InvalidSampleRate(self.sample_rate))
        }
    }
}

/// FM synthesis engine.
///
/// All state is sized at construction; `process` and `process_block` never
/// allocate, lock or block.
pub struct SynthesisEngine {
    config: EngineConfig,
    prepared: bool,
    voices: [ModulatorVoice; NUM_VOICES],
    carrier: CarrierOscillator,
    control: Arc<ControlPort>,
    /// Completion flags as last mirrored into the control port.
    published: [bool; NUM_VOICES],
    samples_rendered: u64,
}

impl SynthesisEngine {
    /// Create an unprepared engine with its own control port.
    pub fn new() -> Self {
        Self::with_control(Arc::new(ControlPort::default()))
    }

    /// Create an unprepared engine reading from a shared control port.
    pub fn with_control(control: Arc<ControlPort>) -> Self {
        let config = EngineConfig::new(0.0);
        let voices = core::array::from_fn(|i| ModulatorVoice::new(VoiceId::from_index(i), config.modulation_target));
        let carrier = CarrierOscillator::new(control.base_frequency() as f64);
        Self {
            config,
            prepared: false,
            voices,
            carrier,
            control,
            published: [false; NUM_VOICES],
            samples_rendered: 0,
        }
    }

    /// Prepare for rendering at `sample_rate`, keeping the other settings.
    pub fn prepare(&mut self, sample_rate: f64) -> Result<(), EngineError> {
        self.prepare_with(EngineConfig { sample_rate, ..self.config })
    }

    /// Prepare with a full configuration.
    ///
    /// Zeroes every oscillator phase, idles every envelope and re-derives
    /// all phase increments for the new sample rate.
    pub fn prepare_with(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.config = config;
        for voice in &mut self.voices {
            voice.prepare(config.sample_rate, config.modulation_target);
        }
        self.carrier.set_base_frequency(self.control.base_frequency() as f64);
        self.carrier.prepare(config.sample_rate);
        self.published = [false; NUM_VOICES];
        for id in VoiceId::all() {
            self.control.publish_completed(id, false);
        }
        self.samples_rendered = 0;
        self.prepared = true;
        Ok(())
    }

    /// Map a trigger event to synthesis parameters and start the sweep.
    pub fn dispatch_trigger(&mut self, event: TriggerEvent) -> Result<(), EngineError> {
        let frequency = mapping::period_to_frequency(event.period);
        let ramp = mapping::distance_to_ramp_time(
            event.distance_px,
            self.config.max_ramp_seconds as f32,
            &self.config.mapping,
        );
        self.trigger_voice(event.voice_id, frequency as f64, ramp as f64)
    }

    /// Start a sweep on `voice_id` with explicit synthesis parameters.
    pub fn trigger_voice(&mut self, voice_id: u8, frequency_hz: f64, ramp_seconds: f64) -> Result<(), EngineError> {
        let id = VoiceId::new(voice_id)?;
        if !self.prepared {
            return Err(EngineError::Unprepared);
        }
        self.voices[id.index()].trigger(frequency_hz, ramp_seconds);
        self.publish_completion(id);
        Ok(())
    }

    /// Publish a new carrier base frequency. Takes effect on the next sample.
    pub fn set_base_frequency(&mut self, hz: f32) {
        self.control.set_base_frequency(hz);
    }

    /// Render `num_samples` samples lazily.
    ///
    /// Pending triggers from the control port are applied before the first
    /// sample. The iterator is single-pass: each item advances the engine.
    pub fn process_block(&mut self, num_samples: usize) -> BlockIter<'_> {
        debug_assert!(self.prepared, "process_block called before prepare");
        self.poll_control();
        BlockIter { engine: self, remaining: num_samples }
    }

    /// Render into `out`, one sample per element.
    pub fn process(&mut self, out: &mut [f32]) {
        debug_assert!(self.prepared, "process called before prepare");
        self.poll_control();
        for sample in out.iter_mut() {
            *sample = self.render_sample();
        }
    }

    /// Apply any triggers posted to the control port.
    fn poll_control(&mut self) {
        if !self.prepared {
            return;
        }
        for id in VoiceId::all() {
            if let Some(event) = self.control.take_trigger(id) {
                let result = self.dispatch_trigger(event);
                debug_assert!(result.is_ok(), "port trigger rejected: {:?}", result);
            }
        }
    }

    /// Advance every voice and the carrier by one sample.
    #[inline]
    fn render_sample(&mut self) -> f32 {
        if !self.prepared {
            return 0.0;
        }

        let mut modulation = 0.0;
        for voice in &mut self.voices {
            modulation += voice.advance();
        }
        for id in VoiceId::all() {
            self.publish_completion(id);
        }

        self.carrier.set_base_frequency(self.control.base_frequency() as f64);
        let out = self.carrier.process(modulation, self.config.quantize);
        self.samples_rendered += 1;
        out as f32
    }

    /// Mirror a voice's completion flag into the control port if it changed.
    #[inline]
    fn publish_completion(&mut self, id: VoiceId) {
        let done = self.voices[id.index()].is_completed();
        if self.published[id.index()] != done {
            self.published[id.index()] = done;
            self.control.publish_completed(id, done);
        }
    }

    /// Shared control port for the control thread.
    pub fn control(&self) -> Arc<ControlPort> {
        Arc::clone(&self.control)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn voice(&self, id: VoiceId) -> &ModulatorVoice {
        &self.voices[id.index()]
    }

    pub fn voices(&self) -> &[ModulatorVoice; NUM_VOICES] {
        &self.voices
    }

    pub fn carrier(&self) -> &CarrierOscillator {
        &self.carrier
    }

    /// Whether the last sweep on `id` has finished.
    pub fn completed(&self, id: VoiceId) -> bool {
        self.voices[id.index()].is_completed()
    }

    /// Samples rendered since the last `prepare`.
    pub fn samples_rendered(&self) -> u64 {
        self.samples_rendered
    }
}

impl Default for SynthesisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, single-pass stream of output samples from `process_block`.
pub struct BlockIter<'a> {
    engine: &'a mut SynthesisEngine,
    remaining: usize,
}

impl Iterator for BlockIter<'_> {
    type Item = f32;

    #[inline]
    fn next(&mut self) -> Option<f32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.engine.render_sample())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BlockIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeStage;
    use crate::scale::SCALE_TABLE;
    use alloc::vec;
    use core::f64::consts::TAU;

    fn engine(sample_rate: f64) -> SynthesisEngine {
        let mut e = SynthesisEngine::new();
        e.prepare(sample_rate).unwrap();
        e
    }

    fn id(n: u8) -> VoiceId {
        VoiceId::new(n).unwrap()
    }

    fn skip(e: &mut SynthesisEngine, n: usize) {
        e.process_block(n).for_each(drop);
    }

    #[test]
    fn prepare_rejects_bad_sample_rates() {
        let mut e = SynthesisEngine::new();
        assert_eq!(e.prepare(0.0), Err(EngineError::InvalidSampleRate(0.0)));
        assert_eq!(e.prepare(-44100.0), Err(EngineError::InvalidSampleRate(-44100.0)));
        assert!(e.prepare(f64::NAN).is_err());
        assert!(!e.is_prepared());
    }

    #[test]
    fn trigger_before_prepare_is_rejected() {
        let mut e = SynthesisEngine::new();
        assert_eq!(e.trigger_voice(1, 500.0, 1.0), Err(EngineError::Unprepared));
    }

    #[test]
    fn envelope_scenario_48k_five_second_ramp() {
        let mut e = engine(48000.0);
        e.trigger_voice(1, 500.0, 5.0).unwrap();
        let inc = e.voice(id(1)).envelope().increment();
        assert!((inc - 0.0041667).abs() < 1e-6);

        skip(&mut e, 240_000);
        assert_eq!(e.voice(id(1)).envelope().value(), 1000.0);
        assert_eq!(e.voice(id(1)).stage(), EnvelopeStage::Falling);
        assert!(!e.completed(id(1)));

        skip(&mut e, 240_000);
        assert_eq!(e.voice(id(1)).envelope().value(), 0.0);
        assert!(e.completed(id(1)));
        assert!(e.control().completed(id(1)));
    }

    #[test]
    fn idle_voices_give_pure_carrier() {
        let sr = 48000.0;
        let mut e = engine(sr);
        e.set_base_frequency(440.0);
        for (n, got) in e.process_block(4800).enumerate() {
            let expected = 0.5 * libm::sin(TAU * 440.0 * n as f64 / sr);
            assert!((got as f64 - expected).abs() < 1e-6, "sample {}", n);
        }
    }

    #[test]
    fn held_voices_contribute_nothing() {
        let mut e = engine(48000.0);
        e.set_base_frequency(440.0);
        for n in 1..=4 {
            e.trigger_voice(n, 300.0 * n as f64, 0.01).unwrap();
        }
        skip(&mut e, 2000);
        for v in VoiceId::all() {
            assert_eq!(e.voice(v).stage(), EnvelopeStage::Held);
        }
        for _ in 0..1000 {
            e.process_block(1).for_each(drop);
            assert_eq!(e.carrier().instantaneous_frequency(), 440.0);
        }
    }

    #[test]
    fn active_voice_modulates_carrier() {
        let mut e = engine(48000.0);
        e.set_base_frequency(440.0);
        e.trigger_voice(2, 700.0, 0.5).unwrap();
        let mut deviated = false;
        for _ in 0..10_000 {
            e.process_block(1).for_each(drop);
            if (e.carrier().instantaneous_frequency() - 440.0).abs() > 1.0 {
                deviated = true;
            }
        }
        assert!(deviated);
    }

    #[test]
    fn invalid_voice_is_dropped_without_side_effects() {
        let mut e = engine(48000.0);
        assert_eq!(
            e.dispatch_trigger(TriggerEvent::new(5, 100.0, 3.0)),
            Err(EngineError::InvalidVoiceId(5))
        );
        assert_eq!(
            e.dispatch_trigger(TriggerEvent::new(0, 100.0, 3.0)),
            Err(EngineError::InvalidVoiceId(0))
        );
        for v in VoiceId::all() {
            assert_eq!(e.voice(v).stage(), EnvelopeStage::Idle);
        }
    }

    #[test]
    fn dispatch_maps_period_and_distance() {
        let mut e = engine(48000.0);
        e.dispatch_trigger(TriggerEvent::new(3, 600.0, 2.0)).unwrap();
        let v = e.voice(id(3));
        assert!((v.frequency_hz() - 2000.0).abs() < 1e-3);
        // 600 px of 1200 => 5 s ramp
        let expected_inc = 1000.0 / (48000.0 * 5.0);
        assert!((v.envelope().increment() - expected_inc).abs() < 1e-7);
    }

    #[test]
    fn double_dispatch_restarts_rather_than_compounds() {
        let mut e = engine(48000.0);
        let ev = TriggerEvent::new(1, 120.0, 5.0);
        e.dispatch_trigger(ev).unwrap();
        skip(&mut e, 5000);
        e.dispatch_trigger(ev).unwrap();
        e.dispatch_trigger(ev).unwrap();
        assert_eq!(e.voice(id(1)).envelope().value(), 0.0);
        assert_eq!(e.voice(id(1)).stage(), EnvelopeStage::Rising);

        let inc = e.voice(id(1)).envelope().increment();
        skip(&mut e, 1);
        assert!((e.voice(id(1)).envelope().value() - inc).abs() < 1e-12);
    }

    #[test]
    fn port_triggers_apply_at_next_block() {
        let mut e = engine(48000.0);
        let port = e.control();
        skip(&mut e, 64);

        port.publish_trigger(TriggerEvent::new(4, 1200.0, 9.0)).unwrap();
        assert_eq!(e.voice(id(4)).stage(), EnvelopeStage::Idle);

        let mut block = e.process_block(64);
        block.next();
        drop(block);
        assert_eq!(e.voice(id(4)).stage(), EnvelopeStage::Rising);
        assert!(!port.has_pending(id(4)));
    }

    #[test]
    fn every_port_slot_is_dispatched() {
        let mut e = engine(8000.0);
        let port = e.control();
        for voice in 1..=4 {
            port.publish_trigger(TriggerEvent::new(voice, f32::NAN, f32::NAN)).unwrap();
        }
        skip(&mut e, 1);
        for v in VoiceId::all() {
            assert_eq!(e.voice(v).stage(), EnvelopeStage::Rising);
            // NaN period arrives as the slowest modulator
            assert_eq!(e.voice(v).frequency_hz(), 5.0);
        }
    }

    #[test]
    fn base_frequency_is_read_every_sample() {
        let mut e = engine(48000.0);
        let port = e.control();
        port.set_base_frequency(261.63);
        skip(&mut e, 1);
        assert!((e.carrier().instantaneous_frequency() - 261.63f32 as f64).abs() < 1e-9);
        port.set_base_frequency(1760.0);
        skip(&mut e, 1);
        assert_eq!(e.carrier().instantaneous_frequency(), 1760.0);
    }

    #[test]
    fn quantized_engine_only_emits_scale_frequencies() {
        let mut e = SynthesisEngine::new();
        e.prepare_with(EngineConfig::new(48000.0).with_quantize(true)).unwrap();
        e.set_base_frequency(500.0);
        e.trigger_voice(1, 50.0, 0.05).unwrap();
        for _ in 0..5000 {
            skip(&mut e, 1);
            let f = e.carrier().instantaneous_frequency() as f32;
            assert!(SCALE_TABLE.contains(&f), "{} not on scale", f);
        }
    }

    #[test]
    fn phases_stay_bounded_under_long_runs() {
        let mut e = engine(44100.0);
        e.set_base_frequency(1975.53);
        for n in 1..=4 {
            e.trigger_voice(n, 500.0 * n as f64, 2.0).unwrap();
        }
        let mut buf = vec![0.0f32; 512];
        for _ in 0..400 {
            e.process(&mut buf);
            assert!((0.0..TAU).contains(&e.carrier().phase()));
            for v in e.voices() {
                assert!((0.0..TAU).contains(&v.phase()));
            }
        }
        assert_eq!(e.samples_rendered(), 512 * 400);
    }

    #[test]
    fn process_and_process_block_agree() {
        let mut a = engine(48000.0);
        let mut b = engine(48000.0);
        for e in [&mut a, &mut b] {
            e.set_base_frequency(330.0);
            e.trigger_voice(2, 440.0, 0.2).unwrap();
        }
        let mut buf = vec![0.0f32; 1024];
        a.process(&mut buf);
        let streamed: alloc::vec::Vec<f32> = b.process_block(1024).collect();
        assert_eq!(buf, streamed);
    }

    #[test]
    fn process_block_is_exact_size() {
        let mut e = engine(48000.0);
        let it = e.process_block(37);
        assert_eq!(it.len(), 37);
        assert_eq!(it.count(), 37);
    }

    #[test]
    fn reprepare_resets_state() {
        let mut e = engine(48000.0);
        e.trigger_voice(1, 500.0, 0.01).unwrap();
        skip(&mut e, 2000);
        assert!(e.completed(id(1)));
        e.prepare(96000.0).unwrap();
        assert!(!e.completed(id(1)));
        assert!(!e.control().completed(id(1)));
        assert_eq!(e.carrier().phase(), 0.0);
        assert_eq!(e.samples_rendered(), 0);
        assert!((e.voice(id(1)).phase_increment() - core::f64::consts::PI * 500.0 / 96000.0).abs() < 1e-15);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "before prepare")]
    fn unprepared_render_fails_fast_in_debug() {
        let mut e = SynthesisEngine::new();
        let mut buf = [0.0f32; 16];
        e.process(&mut buf);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn unprepared_render_is_silent_in_release() {
        let mut e = SynthesisEngine::new();
        let mut buf = [1.0f32; 16];
        e.process(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
        assert!(e.process_block(8).all(|s| s == 0.0));
    }
}
