//! Lock-free handoff between a control thread and the render thread.
//!
//! Each voice has one pending-trigger slot: the control side overwrites it,
//! the render side claims it with a swap. The carrier base frequency is an
//! atomic scalar read once per sample. Completion flags flow the other way,
//! published by the render thread after every block.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::error::EngineError;
use crate::event::{TriggerEvent, VoiceId, NUM_VOICES};

/// Slot sentinel. Both halves are NaN bit patterns, which a validated
/// trigger never carries.
const EMPTY: u64 = u64::MAX;

fn pack(distance_px: f32, period: f32) -> u64 {
    ((distance_px.to_bits() as u64) << 32) | period.to_bits() as u64
}

fn unpack(bits: u64) -> (f32, f32) {
    (f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
}

/// Shared control state. Wrap in an `Arc` and hand clones to the control
/// side; the engine keeps its own clone.
#[derive(Debug)]
pub struct ControlPort {
    base_frequency: AtomicU32,
    pending: [AtomicU64; NUM_VOICES],
    completed: [AtomicBool; NUM_VOICES],
}

impl ControlPort {
    pub fn new(base_frequency_hz: f32) -> Self {
        Self {
            base_frequency: AtomicU32::new(base_frequency_hz.to_bits()),
            pending: core::array::from_fn(|_| AtomicU64::new(EMPTY)),
            completed: core::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    /// Publish a new carrier base frequency (Hz).
    pub fn set_base_frequency(&self, hz: f32) {
        self.base_frequency.store(hz.to_bits(), Ordering::Relaxed);
    }

    /// Latest published base frequency.
    #[inline]
    pub fn base_frequency(&self) -> f32 {
        f32::from_bits(self.base_frequency.load(Ordering::Relaxed))
    }

    /// Post a trigger for the render thread. Replaces any trigger for the
    /// same voice that has not been consumed yet.
    ///
    /// NaN fields are replaced (distance 0, period 9) so the slot sentinel
    /// can never be published.
    pub fn publish_trigger(&self, event: TriggerEvent) -> Result<(), EngineError> {
        let voice = VoiceId::new(event.voice_id)?;
        let distance = if event.distance_px.is_nan() { 0.0 } else { event.distance_px };
        let period = if event.period.is_nan() { crate::mapping::PERIOD_MAX } else { event.period };
        self.pending[voice.index()].store(pack(distance, period), Ordering::Release);
        Ok(())
    }

    /// Claim the pending trigger for `voice`, if any.
    #[inline]
    pub fn take_trigger(&self, voice: VoiceId) -> Option<TriggerEvent> {
        let bits = self.pending[voice.index()].swap(EMPTY, Ordering::Acquire);
        if bits == EMPTY {
            return None;
        }
        let (distance_px, period) = unpack(bits);
        Some(TriggerEvent::new(voice.get(), distance_px, period))
    }

    /// Whether a trigger is waiting for `voice`.
    pub fn has_pending(&self, voice: VoiceId) -> bool {
        self.pending[voice.index()].load(Ordering::Acquire) != EMPTY
    }

    /// Completion flag as last published by the render thread.
    pub fn completed(&self, voice: VoiceId) -> bool {
        self.completed[voice.index()].load(Ordering::Acquire)
    }

    pub(crate) fn publish_completed(&self, voice: VoiceId, done: bool) {
        self.completed[voice.index()].store(done, Ordering::Release);
    }
}

impl Default for ControlPort {
    fn default() -> Self {
        Self::new(440.0)
    }
}
