//! Trigger mapping: spatial parameters from the control layer to
//! synthesis parameters.
//!
//! Pure functions only. The control layer reports a distance in pixels and a
//! period parameter; these become a ramp time in seconds and a modulator
//! frequency in Hz.

use crate::scale;

/// Lowest accepted period parameter (maps to the highest frequency).
pub const PERIOD_MIN: f32 = 2.0;

/// Highest accepted period parameter (maps to the lowest frequency).
pub const PERIOD_MAX: f32 = 9.0;

/// Modulator frequency at `PERIOD_MIN`.
pub const FREQ_AT_PERIOD_MIN: f32 = 2000.0;

/// Modulator frequency at `PERIOD_MAX`.
pub const FREQ_AT_PERIOD_MAX: f32 = 5.0;

/// Carrier base-frequency range reachable from a canvas position.
pub const BASE_FREQ_MIN: f32 = 5.0;
pub const BASE_FREQ_MAX: f32 = 2000.0;

/// Constants of the distance-to-ramp mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerMapping {
    /// Distance (px) that maps to the full ramp time.
    pub reference_distance_px: f32,
    /// Upper bound of the intermediate scaled distance.
    pub max_scaled_distance: f32,
}

impl Default for TriggerMapping {
    fn default() -> Self {
        Self {
            reference_distance_px: 1200.0,
            max_scaled_distance: 100.0,
        }
    }
}

/// Linear interpolation of `x` from `[x0, x1]` onto `[y0, y1]`.
fn lerp(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Map a period parameter in `[2, 9]` onto `[2000, 5]` Hz.
///
/// Inverted: a larger period gives a lower frequency. Out-of-range input is
/// clamped first.
pub fn period_to_frequency(period: f32) -> f32 {
    let p = period.clamp(PERIOD_MIN, PERIOD_MAX);
    lerp(p, PERIOD_MIN, PERIOD_MAX, FREQ_AT_PERIOD_MIN, FREQ_AT_PERIOD_MAX)
}

/// Map a distance in pixels onto a ramp time in seconds.
///
/// `scaled = distance × max_scaled / reference`, bounded to
/// `[0, max_scaled]`, then `ramp = max_ramp × scaled / max_scaled`.
pub fn distance_to_ramp_time(distance_px: f32, max_ramp_seconds: f32, mapping: &TriggerMapping) -> f32 {
    if mapping.reference_distance_px <= 0.0 || mapping.max_scaled_distance <= 0.0 {
        return 0.0;
    }
    let scaled = distance_px * (mapping.max_scaled_distance / mapping.reference_distance_px);
    // NaN distances fall to zero; the envelope floors the ramp anyway
    let scaled = if scaled.is_nan() { 0.0 } else { scaled.clamp(0.0, mapping.max_scaled_distance) };
    max_ramp_seconds * (scaled / mapping.max_scaled_distance)
}

/// Map a horizontal canvas position onto a quantized carrier base frequency.
///
/// `x / width` is clamped to `[0, 1]`, spread over `[5, 2000]` Hz and
/// snapped to the scale.
pub fn position_to_base_frequency(x: f32, width: f32) -> f32 {
    let t = if width > 0.0 { (x / width).clamp(0.0, 1.0) } else { 0.0 };
    let t = if t.is_nan() { 0.0 } else { t };
    scale::quantize(BASE_FREQ_MIN + t * (BASE_FREQ_MAX - BASE_FREQ_MIN))
}
