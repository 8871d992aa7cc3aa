//! Headless controller for tekhne.
//!
//! Owns the shared control port and manages live playback and offline
//! rendering, so the CLI and any other front end share one API.

mod error;
mod score;
mod wav;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tk_audio::{AudioOutput, CpalOutput};
use tk_engine::{mapping, ControlPort, EngineConfig, EventQueue, ScoreEvent, ScorePayload, SynthesisEngine};

// Re-export common types so callers don't need tk-engine directly.
pub use tk_engine::{quantize, EngineError, TriggerEvent, VoiceId, SCALE_TABLE};

pub use error::MasterError;
pub use score::{BaseCue, Score, TriggerCue, MAX_DURATION_SECONDS, MAX_SAMPLE_RATE};
pub use wav::{samples_to_wav, write_wav};

/// Samples rendered per pass on the playback thread.
const BLOCK_SIZE: usize = 256;

/// Headless synth controller.
pub struct Controller {
    control: Arc<ControlPort>,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            control: Arc::new(ControlPort::default()),
            playback: None,
        }
    }

    /// Control port shared with the playback engine.
    pub fn control(&self) -> Arc<ControlPort> {
        Arc::clone(&self.control)
    }

    // --- Live control ---

    /// Send a trigger to the playing engine. It applies at the start of the
    /// next block.
    pub fn trigger(&self, event: TriggerEvent) -> Result<(), MasterError> {
        self.control.publish_trigger(event).map_err(|e| {
            tracing::warn!(voice = event.voice_id, "trigger dropped: {}", e);
            MasterError::from(e)
        })
    }

    /// Move the carrier base frequency (Hz). Applies on the next sample.
    pub fn set_base_frequency(&self, hz: f32) {
        self.control.set_base_frequency(hz);
    }

    /// Set the base frequency from a horizontal canvas position. Returns the
    /// quantized frequency.
    pub fn set_base_from_position(&self, x: f32, width: f32) -> f32 {
        let hz = mapping::position_to_base_frequency(x, width);
        self.control.set_base_frequency(hz);
        hz
    }

    /// Whether the last sweep on `voice` has finished, as published by the
    /// playback thread.
    pub fn voice_completed(&self, voice: VoiceId) -> bool {
        self.control.completed(voice)
    }

    // --- Real-time playback ---

    /// Play `score` on the default output device.
    pub fn play(&mut self, score: &Score) {
        self.stop();

        let score = score.clone();
        let control = Arc::clone(&self.control);
        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let stop = stop_signal.clone();
        let done = finished.clone();

        let thread = std::thread::spawn(move || {
            audio_thread(score, control, stop, done);
        });

        self.playback = Some(PlaybackHandle {
            stop_signal,
            finished,
            thread: Some(thread),
        });
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
            tracing::info!("playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    // --- Offline rendering ---

    /// Render `score` at its own sample rate.
    ///
    /// Uses a private engine and control port, so live playback is not
    /// disturbed.
    pub fn render(&self, score: &Score) -> Result<Vec<f32>, MasterError> {
        score.validate()?;
        let mut engine = SynthesisEngine::new();
        engine.set_base_frequency(score.base_frequency);
        engine.prepare_with(engine_config(score, score.sample_rate))?;

        let mut queue = score.to_queue(score.sample_rate);
        let mut samples = vec![0.0; score.total_samples(score.sample_rate) as usize];
        render_span(&mut engine, &mut queue, 0, &mut samples);

        tracing::info!(
            samples = samples.len(),
            events = queue.len(),
            sample_rate = score.sample_rate,
            "rendered score"
        );
        Ok(samples)
    }

    /// Render `score` and write it as a 16-bit mono WAV file.
    pub fn render_to_wav(&self, score: &Score, path: impl AsRef<Path>) -> Result<(), MasterError> {
        let samples = self.render(score)?;
        write_wav(path.as_ref(), &samples, score.sample_rate)?;
        tracing::info!(path = %path.as_ref().display(), "wrote WAV");
        Ok(())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn engine_config(score: &Score, sample_rate: u32) -> EngineConfig {
    EngineConfig::new(sample_rate as f64).with_quantize(score.quantize)
}

fn apply_event(engine: &mut SynthesisEngine, event: &ScoreEvent) {
    match event.payload {
        ScorePayload::Trigger(t) => {
            let result = engine.dispatch_trigger(t);
            debug_assert!(result.is_ok(), "score trigger rejected: {:?}", result);
        }
        ScorePayload::BaseFrequency(hz) => engine.set_base_frequency(hz),
    }
}

/// Render `out`, which begins at absolute sample `start`, applying queued
/// events exactly at their sample.
fn render_span(engine: &mut SynthesisEngine, queue: &mut EventQueue, start: u64, out: &mut [f32]) {
    let mut pos = 0;
    while pos < out.len() {
        for i in queue.drain_until(start + pos as u64) {
            if let Some(event) = queue.get(i) {
                apply_event(engine, event);
            }
        }
        let end = queue
            .next_time()
            .map_or(out.len(), |t| ((t - start) as usize).min(out.len()));
        engine.process(&mut out[pos..end]);
        pos = end;
    }
}

fn audio_thread(score: Score, control: Arc<ControlPort>, stop_signal: Arc<AtomicBool>, finished: Arc<AtomicBool>) {
    let (mut output, consumer) = match CpalOutput::new() {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("cannot open audio output: {}", e);
            finished.store(true, Ordering::Relaxed);
            return;
        }
    };

    let sample_rate = output.sample_rate();
    control.set_base_frequency(score.base_frequency);
    let mut engine = SynthesisEngine::with_control(control);
    if let Err(e) = engine.prepare_with(engine_config(&score, sample_rate)) {
        tracing::error!("cannot prepare engine: {}", e);
        finished.store(true, Ordering::Relaxed);
        return;
    }
    let mut queue = score.to_queue(sample_rate);

    if let Err(e) = output.build_stream(consumer) {
        tracing::error!("cannot build audio stream: {}", e);
        finished.store(true, Ordering::Relaxed);
        return;
    }
    if let Err(e) = output.start() {
        tracing::warn!("audio start failed: {}", e);
    }

    let total = score.total_samples(sample_rate);
    tracing::info!(sample_rate, total_samples = total, events = queue.len(), "playback started");

    let mut block = vec![0.0f32; BLOCK_SIZE];
    let mut position: u64 = 0;

    'render: while position < total && !stop_signal.load(Ordering::Relaxed) {
        let n = BLOCK_SIZE.min((total - position) as usize);

        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| render_span(&mut engine, &mut queue, position, &mut block[..n]));
        #[cfg(not(feature = "alloc_check"))]
        render_span(&mut engine, &mut queue, position, &mut block[..n]);

        for &sample in &block[..n] {
            if !output.write_spin(sample, &stop_signal) {
                break 'render;
            }
        }
        position += n as u64;
    }

    // Let the ring buffer drain before the stream is dropped
    for _ in 0..sample_rate / 10 {
        if !output.write_spin(0.0, &stop_signal) {
            break;
        }
    }
    let _ = output.stop();

    finished.store(true, Ordering::Relaxed);
}
