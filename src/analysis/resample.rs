// Resample - linear interpolation to the model's native rate
//
// The neural model expects a fixed-length window at 16 kHz. Live capture
// runs at whatever rate the device offers, so each window is mapped onto
// the target grid by linear interpolation. The output length is always the
// requested length: long inputs are truncated, short inputs are extended
// with silence.

/// Resample `input` from `source_rate` to `target_rate`, producing exactly
/// `target_len` samples
///
/// Output sample `i` reads source position `i * source_rate / target_rate`
/// and interpolates between the two neighbouring input samples. Positions
/// past the end of the input read as silence.
pub fn resample_linear(
    input: &[f32],
    source_rate: u32,
    target_rate: u32,
    target_len: usize,
) -> Vec<f32> {
    if input.is_empty() || source_rate == 0 || target_rate == 0 {
        return vec![0.0; target_len];
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let last = input.len() - 1;

    (0..target_len)
        .map(|i| {
            let position = i as f64 * ratio;
            let index = position.floor() as usize;
            if index > last {
                return 0.0;
            }
            let t = (position - index as f64) as f32;
            let current = input[index];
            let next = input[(index + 1).min(last)];
            current + (next - current) * t
        })
        .collect()
}
