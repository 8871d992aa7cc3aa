//! Phase accumulator helpers.

use core::f64::consts::TAU;

/// Wrap a phase into `[0, 2π)`.
///
/// A single add/subtract covers every increment smaller than one cycle;
/// anything larger falls back to a Euclidean remainder.
#[inline]
pub(crate) fn wrap_phase(phase: f64) -> f64 {
    let wrapped = if phase >= TAU {
        phase - TAU
    } else if phase < 0.0 {
        phase + TAU
    } else {
        return phase;
    };
    if (0.0..TAU).contains(&wrapped) {
        wrapped
    } else {
        let r = libm::fmod(wrapped, TAU);
        let r = if r < 0.0 { r + TAU } else { r };
        // fmod of a tiny negative value can round up to exactly TAU
        if r >= TAU { 0.0 } else { r }
    }
}
