//! FM synthesis core for tekhne.
//!
//! One sine carrier whose frequency is modulated by four independently
//! triggered sine modulators, each shaped by a one-shot triangular envelope.
//! Everything here is allocation-free once the engine is prepared, so it can
//! run inside an audio callback.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod carrier;
mod control;
mod engine;
mod envelope;
mod error;
mod event;
mod event_queue;
pub mod mapping;
mod phase;
pub mod scale;
mod voice;

pub use carrier::{CarrierOscillator, OUTPUT_GAIN};
pub use control::ControlPort;
pub use engine::{BlockIter, EngineConfig, SynthesisEngine, MAX_RAMP_SECONDS, MODULATION_TARGET};
pub use envelope::{EnvelopeStage, EnvelopeState, MIN_RAMP_SECONDS};
pub use error::EngineError;
pub use event::{ScoreEvent, ScorePayload, TriggerEvent, VoiceId, NUM_VOICES};
pub use event_queue::EventQueue;
pub use mapping::TriggerMapping;
pub use scale::{quantize, SCALE_TABLE};
pub use voice::ModulatorVoice;
