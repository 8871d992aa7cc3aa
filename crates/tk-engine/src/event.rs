//! Trigger and score event types.

use crate::error::EngineError;

/// Number of modulator voices. Fixed; there is no voice allocation.
pub const NUM_VOICES: usize = 4;

/// A validated modulator voice id (1-4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(u8);

impl VoiceId {
    /// Validate a raw voice id.
    pub fn new(id: u8) -> Result<Self, EngineError> {
        if (1..=NUM_VOICES as u8).contains(&id) {
            Ok(Self(id))
        } else {
            Err(EngineError::InvalidVoiceId(id))
        }
    }

    /// Id for a zero-based slot index below `NUM_VOICES`.
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < NUM_VOICES);
        Self(index as u8 + 1)
    }

    /// The 1-based id.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot index.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// All four ids in processing order.
    pub fn all() -> impl Iterator<Item = VoiceId> {
        (1..=NUM_VOICES as u8).map(VoiceId)
    }
}

/// A request from the control layer to start a modulation sweep.
///
/// `voice_id` is unvalidated; the engine rejects ids outside 1-4 on dispatch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerEvent {
    pub voice_id: u8,
    /// Spatial distance in pixels (>= 0). Sets the ramp time.
    pub distance_px: f32,
    /// Period parameter in [2, 9]. Sets the modulator frequency.
    pub period: f32,
}

impl TriggerEvent {
    pub fn new(voice_id: u8, distance_px: f32, period: f32) -> Self {
        Self { voice_id, distance_px, period }
    }
}

/// A timed event in a score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreEvent {
    /// Sample index at which the event takes effect.
    pub at_sample: u64,
    pub payload: ScorePayload,
}

impl ScoreEvent {
    pub fn new(at_sample: u64, payload: ScorePayload) -> Self {
        Self { at_sample, payload }
    }
}

/// What a score event does.
#[derive(Clone, Debug, PartialEq)]
pub enum ScorePayload {
    /// Start a modulation sweep.
    Trigger(TriggerEvent),
    /// Move the carrier base frequency (Hz).
    BaseFrequency(f32),
}
