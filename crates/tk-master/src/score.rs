//! TOML scores: timed triggers and base-frequency moves.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tk_engine::{EventQueue, ScoreEvent, ScorePayload, TriggerEvent, MAX_RAMP_SECONDS, NUM_VOICES};

use crate::error::MasterError;

/// Longest score accepted, in seconds. Offline renders buffer the whole
/// score in memory.
pub const MAX_DURATION_SECONDS: f64 = 3600.0;

/// Highest accepted sample rate (Hz).
pub const MAX_SAMPLE_RATE: u32 = 768_000;

fn default_sample_rate() -> u32 {
    48000
}

fn default_base_frequency() -> f32 {
    440.0
}

/// A timed list of events, rendered offline or played live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Score {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_base_frequency")]
    pub base_frequency: f32,
    #[serde(default)]
    pub quantize: bool,
    /// Explicit length. When absent the score runs past its last event long
    /// enough for a full-length sweep to rise and fall.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, rename = "trigger")]
    pub triggers: Vec<TriggerCue>,
    #[serde(default, rename = "base")]
    pub base_changes: Vec<BaseCue>,
}

/// `[[trigger]]` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerCue {
    /// Seconds from the start.
    pub at: f64,
    pub voice: u8,
    pub distance: f32,
    pub period: f32,
}

/// `[[base]]` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseCue {
    pub at: f64,
    pub frequency: f32,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            base_frequency: default_base_frequency(),
            quantize: false,
            duration_seconds: None,
            triggers: Vec::new(),
            base_changes: Vec::new(),
        }
    }
}

fn check_time(at: f64, what: &str) -> Result<(), MasterError> {
    if at.is_finite() && at >= 0.0 {
        Ok(())
    } else {
        Err(MasterError::InvalidScore(format!("{} time {} must be >= 0", what, at)))
    }
}

fn seconds_to_samples(seconds: f64, sample_rate: u32) -> u64 {
    (seconds * sample_rate as f64).round() as u64
}

impl Score {
    /// Parse and validate a score from TOML text.
    pub fn parse(text: &str) -> Result<Self, MasterError> {
        let score: Score = toml::from_str(text)?;
        score.validate()?;
        Ok(score)
    }

    /// Read and parse a score file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MasterError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn validate(&self) -> Result<(), MasterError> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(MasterError::InvalidScore(format!(
                "sample_rate {} must be in 1-{}",
                self.sample_rate, MAX_SAMPLE_RATE
            )));
        }
        if let Some(d) = self.duration_seconds {
            if !(d.is_finite() && d >= 0.0) {
                return Err(MasterError::InvalidScore(format!("duration_seconds {} must be >= 0", d)));
            }
        }
        for t in &self.triggers {
            check_time(t.at, "trigger")?;
            if !(1..=NUM_VOICES as u8).contains(&t.voice) {
                return Err(MasterError::InvalidScore(format!(
                    "trigger at {}s: voice {} is not in 1-{}",
                    t.at, t.voice, NUM_VOICES
                )));
            }
        }
        for b in &self.base_changes {
            check_time(b.at, "base")?;
        }
        let duration = self.duration_seconds();
        if duration > MAX_DURATION_SECONDS {
            return Err(MasterError::InvalidScore(format!(
                "duration {}s exceeds the {}s limit",
                duration, MAX_DURATION_SECONDS
            )));
        }
        Ok(())
    }

    /// Time of the last event in seconds, or 0 for an empty score.
    pub fn last_event_seconds(&self) -> f64 {
        let triggers = self.triggers.iter().map(|t| t.at);
        let bases = self.base_changes.iter().map(|b| b.at);
        triggers.chain(bases).fold(0.0, f64::max)
    }

    /// Effective length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
            .unwrap_or_else(|| self.last_event_seconds() + 2.0 * MAX_RAMP_SECONDS)
    }

    /// Effective length in samples at `sample_rate`.
    pub fn total_samples(&self, sample_rate: u32) -> u64 {
        seconds_to_samples(self.duration_seconds(), sample_rate)
    }

    /// Schedule every event at its sample time. Events at the same sample
    /// apply in file order, base changes before triggers.
    pub fn to_queue(&self, sample_rate: u32) -> EventQueue {
        let mut queue = EventQueue::new();
        for b in &self.base_changes {
            queue.push(ScoreEvent::new(
                seconds_to_samples(b.at, sample_rate),
                ScorePayload::BaseFrequency(b.frequency),
            ));
        }
        for t in &self.triggers {
            queue.push(ScoreEvent::new(
                seconds_to_samples(t.at, sample_rate),
                ScorePayload::Trigger(TriggerEvent::new(t.voice, t.distance, t.period)),
            ));
        }
        queue
    }
}
