//! Frequency-axis shaping of a byte spectrum into drawable amplitudes.
//!
//! Nothing here carries state between frames: every call works only on the
//! snapshot it is given.

const MAX_MAGNITUDE: f32 = 255.0;
/// Strength of the low-frequency cut at bin zero.
const BASS_CUT: f32 = 0.5;
/// Width of the cut, as a fraction of the used bin count.
const BASS_CUT_SPAN: f32 = 0.1;
/// The loudest bin lands at 1/0.7 before clamping, so a few bins saturate.
const HEADROOM: f32 = 0.7;

/// Weight applied to bin `i` of `bin_count`: 0.5 at `i = 0`, rising towards 1.
pub fn frequency_factor(i: usize, bin_count: usize) -> f32 {
    1.0 - BASS_CUT * (-(i as f32) / (bin_count as f32 * BASS_CUT_SPAN)).exp()
}

/// Shape the lower half of `snapshot` into amplitudes in `[0, 1]`.
///
/// The result always has `snapshot.len() / 2` entries.
pub fn smooth_frequency_amplitudes(snapshot: &[u8]) -> Vec<f32> {
    let bin_count = snapshot.len() / 2;
    let raw: Vec<f32> = snapshot[..bin_count]
        .iter()
        .map(|&b| b as f32 / MAX_MAGNITUDE)
        .collect();

    let frame_max = raw.iter().copied().fold(0.0f32, f32::max);
    let divisor = if frame_max > 0.0 { frame_max * HEADROOM } else { 1.0 };

    raw.iter()
        .enumerate()
        .map(|(i, &amplitude)| (amplitude * frequency_factor(i, bin_count) / divisor).min(1.0))
        .collect()
}
