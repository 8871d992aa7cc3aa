//! Engine error type.

use core::fmt;

/// Errors reported by the synthesis engine.
///
/// None of these ever cross the render path as a panic in release builds;
/// the render path resolves them to silence or drops the offending event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineError {
    /// Voice id outside `1..=4`. The event is dropped.
    InvalidVoiceId(u8),
    /// `prepare` was given a sample rate that is not finite and positive.
    InvalidSampleRate(f64),
    /// Rendering was requested before `prepare`.
    Unprepared,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidVoiceId(id) => write!(f, "Invalid voice id: {} (expected 1-4)", id),
            EngineError::InvalidSampleRate(rate) => write!(f, "Invalid sample rate: {}", rate),
            EngineError::Unprepared => write!(f, "Engine used before prepare()"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}
