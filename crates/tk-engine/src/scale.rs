//! Nearest-neighbour snapping onto a fixed musical scale.

/// C Lydian over octaves 3-6: seven degrees per octave, ascending.
pub static SCALE_TABLE: [f32; 28] = [
    // Octave 3
    130.81, 146.83, 164.81, 185.00, 196.00, 220.00, 246.94,
    // Octave 4
    261.63, 293.66, 329.63, 369.99, 392.00, 440.00, 493.88,
    // Octave 5
    523.25, 587.33, 659.26, 739.99, 783.99, 880.00, 987.77,
    // Octave 6
    1046.50, 1174.66, 1318.51, 1479.98, 1567.98, 1760.00, 1975.53,
];

/// Index of the table entry closest to `frequency`.
///
/// Ties go to the lower index (strict `<` comparison). A NaN input never
/// compares closer than anything, so it resolves to index 0.
pub fn nearest_index(frequency: f32) -> usize {
    let mut best = 0;
    let mut best_dist = libm::fabsf(SCALE_TABLE[0] - frequency);
    for (i, &entry) in SCALE_TABLE.iter().enumerate().skip(1) {
        let dist = libm::fabsf(entry - frequency);
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Snap `frequency` to the nearest scale member.
pub fn quantize(frequency: f32) -> f32 {
    SCALE_TABLE[nearest_index(frequency)]
}

/// The process-wide scale table.
pub fn scale_table() -> &'static [f32; 28] {
    &SCALE_TABLE
}
