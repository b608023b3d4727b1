//! Opus frame encoding, 20 ms stereo frames at a configurable constant
//! bitrate. Wraps the `opus` crate the way `pmoflac` wraps its decoder
//! counterpart: a thin struct owning the codec handle.

use crate::pcm::{CHANNELS, FRAME_SAMPLES};
use opus::{Application, Bitrate, Channels, Encoder as OpusEncoderHandle};

pub const DEFAULT_BITRATE_BPS: i32 = 128_000;
/// Largest Opus frame the encoder is ever expected to emit at this
/// bitrate and frame size.
const MAX_FRAME_BYTES: usize = 4_000;

pub struct FrameEncoder {
    inner: OpusEncoderHandle,
}

impl FrameEncoder {
    pub fn new(bitrate_bps: i32) -> crate::Result<Self> {
        let mut inner = OpusEncoderHandle::new(48_000, Channels::Stereo, Application::Audio)
            .map_err(crate::PipelineError::EncoderFailed)?;
        inner
            .set_bitrate(Bitrate::Bits(bitrate_bps))
            .map_err(crate::PipelineError::EncoderFailed)?;
        Ok(Self { inner })
    }

    /// Encodes one 20 ms chunk (`FRAME_SAMPLES * CHANNELS` interleaved
    /// samples) into an Opus payload.
    pub fn encode(&mut self, samples: &[i16]) -> crate::Result<Vec<u8>> {
        debug_assert_eq!(samples.len(), FRAME_SAMPLES * CHANNELS);
        let mut out = vec![0u8; MAX_FRAME_BYTES];
        let written = self
            .inner
            .encode(samples, &mut out)
            .map_err(crate::PipelineError::EncoderFailed)?;
        out.truncate(written);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_silent_frame() {
        let mut encoder = FrameEncoder::new(DEFAULT_BITRATE_BPS).unwrap();
        let silence = vec![0i16; FRAME_SAMPLES * CHANNELS];
        let payload = encoder.encode(&silence).unwrap();
        assert!(!payload.is_empty());
        assert!(payload.len() <= MAX_FRAME_BYTES);
    }
}
