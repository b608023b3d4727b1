//! `AudioPipeline`: transcoder stdout -> PCM -> Opus frames -> a voice
//! sink, paced by a bounded channel that absorbs jitter and drops
//! frames rather than stalling the decoder under sustained backpressure.

use crate::encoder::{FrameEncoder, DEFAULT_BITRATE_BPS};
use crate::framing::dca_frame;
use crate::pcm::{apply_gain, bytes_to_samples, clamp_gain, CHUNK_BYTES};
use crate::sink::VoiceSink;
use crate::transcoder::{classify_exit, Transcoder, TranscoderConfig};
use crate::PipelineError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// ~200 ms of audio at 20 ms/frame.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;
pub const DEFAULT_FRAME_DROP_THRESHOLD: Duration = Duration::from_secs(1);
/// How long the engine should wait after a manual `Stop` before treating
/// the pipeline as fully torn down (transcoder exited, sink's "playing"
/// flag reset) and advancing on its own.
pub const DEFAULT_POST_STOP_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// What a pipeline run ended with: whether the engine should move the
/// tracklist forward on its own, and any failure that caused the end.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub auto_advance: bool,
    pub error: Option<PipelineError>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub transcoder: TranscoderConfig,
    pub bitrate_bps: i32,
    pub channel_capacity: usize,
    pub frame_drop_threshold: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transcoder: TranscoderConfig::default(),
            bitrate_bps: DEFAULT_BITRATE_BPS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            frame_drop_threshold: DEFAULT_FRAME_DROP_THRESHOLD,
        }
    }
}

struct Session {
    paused: Arc<AtomicBool>,
    pause_notify: Arc<Notify>,
    stop_token: CancellationToken,
    stop_auto_advance: Arc<AtomicBool>,
    producer: JoinHandle<()>,
    sender: JoinHandle<()>,
}

/// Per-guild audio pipeline. One instance lives for the guild's
/// lifetime; `play` is called once per song.
pub struct AudioPipeline {
    config: PipelineConfig,
    state: Mutex<PipelineState>,
    volume: Arc<Mutex<f32>>,
    session: Mutex<Option<Session>>,
}

impl AudioPipeline {
    pub fn new(config: PipelineConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(PipelineState::Idle),
            volume: Arc::new(Mutex::new(1.0)),
            session: Mutex::new(None),
        })
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap()
    }

    /// Gain applied to PCM before encoding; persists across plays so a
    /// volume set while idle takes effect on the next song.
    pub fn set_volume(&self, gain: f32) {
        *self.volume.lock().unwrap() = clamp_gain(gain);
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    /// Starts streaming `stream_url` to `sink`. Only valid from `Idle`
    /// or `Stopped`. Returns a receiver that resolves once the run ends,
    /// naturally or otherwise.
    pub async fn play(
        self: &Arc<Self>,
        stream_url: String,
        sink: Arc<dyn VoiceSink>,
    ) -> crate::Result<oneshot::Receiver<PipelineOutcome>> {
        {
            let mut state = self.state.lock().unwrap();
            if !matches!(*state, PipelineState::Idle | PipelineState::Stopped) {
                return Err(PipelineError::InvalidState);
            }
            *state = PipelineState::Playing;
        }

        let transcoder = match Transcoder::spawn(&self.config.transcoder, &stream_url) {
            Ok(t) => t,
            Err(error) => {
                *self.state.lock().unwrap() = PipelineState::Stopped;
                return Err(error);
            }
        };

        let paused = Arc::new(AtomicBool::new(false));
        let pause_notify = Arc::new(Notify::new());
        let stop_token = CancellationToken::new();
        let stop_auto_advance = Arc::new(AtomicBool::new(false));
        let voice_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let (frame_tx, frame_rx) = mpsc::channel::<Vec<u8>>(self.config.channel_capacity);
        let (completion_tx, completion_rx) = oneshot::channel();

        let sender = tokio::spawn(run_sender(
            frame_rx,
            sink.clone(),
            stop_token.clone(),
            voice_error.clone(),
        ));

        let producer = tokio::spawn(run_producer(
            transcoder,
            frame_tx,
            stop_token.clone(),
            paused.clone(),
            pause_notify.clone(),
            stop_auto_advance.clone(),
            voice_error,
            sink.requires_dca(),
            self.volume.clone(),
            self.config.bitrate_bps,
            self.config.frame_drop_threshold,
            completion_tx,
        ));

        *self.session.lock().unwrap() = Some(Session {
            paused,
            pause_notify,
            stop_token,
            stop_auto_advance,
            producer,
            sender,
        });

        Ok(completion_rx)
    }

    pub fn pause(&self) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        if *state != PipelineState::Playing {
            return Err(PipelineError::InvalidState);
        }
        *state = PipelineState::Paused;
        if let Some(session) = self.session.lock().unwrap().as_ref() {
            session.paused.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn resume(&self) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        if *state != PipelineState::Paused {
            return Err(PipelineError::InvalidState);
        }
        *state = PipelineState::Playing;
        if let Some(session) = self.session.lock().unwrap().as_ref() {
            session.paused.store(false, Ordering::SeqCst);
            session.pause_notify.notify_waiters();
        }
        Ok(())
    }

    /// Stops playback. `auto_advance` only governs the manual-stop path:
    /// a natural end of stream always reports `auto_advance = true`
    /// regardless of what is passed here.
    pub async fn stop(&self, auto_advance: bool) {
        let session = {
            let mut state = self.state.lock().unwrap();
            *state = PipelineState::Stopped;
            self.session.lock().unwrap().take()
        };

        if let Some(session) = session {
            session.stop_auto_advance.store(auto_advance, Ordering::SeqCst);
            session.stop_token.cancel();
            session.pause_notify.notify_waiters();
            let _ = session.producer.await;
            let _ = session.sender.await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_producer(
    mut transcoder: Transcoder,
    frame_tx: mpsc::Sender<Vec<u8>>,
    stop_token: CancellationToken,
    paused: Arc<AtomicBool>,
    pause_notify: Arc<Notify>,
    stop_auto_advance: Arc<AtomicBool>,
    voice_error: Arc<Mutex<Option<String>>>,
    requires_dca: bool,
    volume: Arc<Mutex<f32>>,
    bitrate_bps: i32,
    frame_drop_threshold: Duration,
    completion_tx: oneshot::Sender<PipelineOutcome>,
) {
    let mut encoder = match FrameEncoder::new(bitrate_bps) {
        Ok(encoder) => encoder,
        Err(error) => {
            let _ = completion_tx.send(PipelineOutcome { auto_advance: false, error: Some(error) });
            return;
        }
    };

    let mut chunk = vec![0u8; CHUNK_BYTES];
    let mut dropped: u64 = 0;

    let outcome = 'outer: loop {
        if paused.load(Ordering::SeqCst) {
            tokio::select! {
                _ = pause_notify.notified() => continue 'outer,
                _ = stop_token.cancelled() => break stop_outcome(&stop_auto_advance, &voice_error),
            }
        }

        let read = tokio::select! {
            result = transcoder.stdout().read_exact(&mut chunk) => result,
            _ = stop_token.cancelled() => break stop_outcome(&stop_auto_advance, &voice_error),
        };

        match read {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break PipelineOutcome { auto_advance: true, error: None };
            }
            Err(_) => {
                let code = transcoder.wait().await;
                let last_line = transcoder.last_stderr_line();
                break PipelineOutcome { auto_advance: false, error: Some(classify_exit(code, &last_line)) };
            }
        }

        let mut samples = bytes_to_samples(&chunk);
        let gain = *volume.lock().unwrap();
        apply_gain(&mut samples, gain);

        let payload = match encoder.encode(&samples) {
            Ok(payload) => payload,
            Err(error) => break PipelineOutcome { auto_advance: false, error: Some(error) },
        };
        let frame = if requires_dca { dca_frame(&payload) } else { payload };

        match tokio::time::timeout(frame_drop_threshold, frame_tx.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                break PipelineOutcome {
                    auto_advance: false,
                    error: Some(PipelineError::VoiceWriteFailed("frame channel closed".to_string())),
                };
            }
            Err(_) => {
                dropped += 1;
                warn!(dropped, "dropping frame: sink backpressure exceeded threshold");
            }
        }
    };

    if dropped > 0 {
        info!(dropped, "pipeline run ended with dropped frames");
    }

    transcoder.kill().await;
    let _ = completion_tx.send(outcome);
}

fn stop_outcome(stop_auto_advance: &AtomicBool, voice_error: &Mutex<Option<String>>) -> PipelineOutcome {
    if let Some(message) = voice_error.lock().unwrap().take() {
        return PipelineOutcome { auto_advance: false, error: Some(PipelineError::VoiceWriteFailed(message)) };
    }
    PipelineOutcome { auto_advance: stop_auto_advance.load(Ordering::SeqCst), error: None }
}

async fn run_sender(
    mut frame_rx: mpsc::Receiver<Vec<u8>>,
    sink: Arc<dyn VoiceSink>,
    stop_token: CancellationToken,
    voice_error: Arc<Mutex<Option<String>>>,
) {
    while let Some(frame) = frame_rx.recv().await {
        if let Err(e) = sink.send(frame).await {
            warn!(error = %e, "voice sink rejected frame");
            *voice_error.lock().unwrap() = Some(e);
            stop_token.cancel();
            break;
        }
    }
    sink.disconnect().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let pipeline = AudioPipeline::new(PipelineConfig::default());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn pause_before_playing_is_rejected() {
        let pipeline = AudioPipeline::new(PipelineConfig::default());
        assert!(matches!(pipeline.pause(), Err(PipelineError::InvalidState)));
    }

    #[test]
    fn resume_without_pause_is_rejected() {
        let pipeline = AudioPipeline::new(PipelineConfig::default());
        assert!(matches!(pipeline.resume(), Err(PipelineError::InvalidState)));
    }

    #[test]
    fn volume_defaults_to_unity_and_clamps() {
        let pipeline = AudioPipeline::new(PipelineConfig::default());
        assert_eq!(pipeline.volume(), 1.0);
        pipeline.set_volume(3.0);
        assert_eq!(pipeline.volume(), crate::MAX_GAIN);
        pipeline.set_volume(-1.0);
        assert_eq!(pipeline.volume(), 0.0);
    }
}
