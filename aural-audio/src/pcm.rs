//! Fixed PCM framing the pipeline speaks internally: 20 ms of 48 kHz
//! stereo 16-bit audio, the cadence the voice gateway's Opus frames run
//! at.

/// Samples per channel in one 20 ms frame at 48 kHz.
pub const FRAME_SAMPLES: usize = 960;
pub const CHANNELS: usize = 2;
/// Bytes in one 20 ms chunk of s16le stereo PCM: 48000 * 2ch * 2B * 0.02s.
pub const CHUNK_BYTES: usize = FRAME_SAMPLES * CHANNELS * 2;

/// Minimum gain (silence) and maximum gain (2x, the spec's `100 / 50`
/// upper bound) a pipeline will apply.
pub const MIN_GAIN: f32 = 0.0;
pub const MAX_GAIN: f32 = 2.0;

pub fn clamp_gain(gain: f32) -> f32 {
    gain.clamp(MIN_GAIN, MAX_GAIN)
}

/// Decodes a raw s16le chunk into samples, in place.
pub fn bytes_to_samples(chunk: &[u8]) -> Vec<i16> {
    chunk
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Scales every sample by `gain`, saturating instead of wrapping on
/// overflow.
pub fn apply_gain(samples: &mut [i16], gain: f32) {
    if (gain - 1.0).abs() < f32::EPSILON {
        return;
    }
    for sample in samples.iter_mut() {
        let scaled = (*sample as f32) * gain;
        *sample = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}
