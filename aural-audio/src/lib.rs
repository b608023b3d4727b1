//! Turns a Ready song's stream URL into paced Opus frames delivered to a
//! voice connection: spawn a transcoder, read 20 ms PCM chunks, apply
//! volume, encode, optionally DCA-frame, and hand off through a bounded
//! channel that drops frames under sustained backpressure rather than
//! stalling the decoder.

mod encoder;
mod error;
mod framing;
mod pcm;
mod pipeline;
mod sink;
mod transcoder;

pub use encoder::{FrameEncoder, DEFAULT_BITRATE_BPS};
pub use error::{PipelineError, Result};
pub use framing::dca_frame;
pub use pcm::{apply_gain, clamp_gain, CHUNK_BYTES, MAX_GAIN, MIN_GAIN};
pub use pipeline::{
    AudioPipeline, PipelineConfig, PipelineOutcome, PipelineState, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_FRAME_DROP_THRESHOLD, DEFAULT_POST_STOP_DRAIN,
};
pub use sink::VoiceSink;
pub use transcoder::TranscoderConfig;
