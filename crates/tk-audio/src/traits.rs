//! Audio output trait and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device init error: {0}")]
    DeviceInit(String),
    #[error("Stream create error: {0}")]
    StreamCreate(String),
    #[error("Playback error: {0}")]
    Playback(String),
    #[error("No audio device available")]
    NoDevice,
}

/// A sink for mono f32 samples.
pub trait AudioOutput {
    /// Device sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Queue samples without blocking. Returns how many were accepted.
    fn write(&mut self, samples: &[f32]) -> usize;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}
