//! Spawns the external transcoder (an ffmpeg-style binary) and exposes
//! its stdout as raw s16le/48kHz/stereo PCM, plus the last stderr line
//! for diagnosing a non-zero exit.
//!
//! stderr is piped rather than discarded outright so a crash can still
//! be explained, but only the trailing line is kept — per-line logging
//! would just echo the reconnect chatter ffmpeg-style tools emit on
//! every flaky-network hiccup.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdout, Command};

#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub binary_path: String,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self { binary_path: "ffmpeg".to_string() }
    }
}

pub struct Transcoder {
    child: Child,
    stdout: ChildStdout,
    last_stderr_line: Arc<Mutex<String>>,
}

impl Transcoder {
    /// Spawns the transcoder against `stream_url`, with network reconnect
    /// flags and output forced to raw PCM on stdout.
    pub fn spawn(config: &TranscoderConfig, stream_url: &str) -> crate::Result<Self> {
        let args = build_args(stream_url);
        let mut command = Command::new(&config.binary_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(binary = %config.binary_path, ?args, "spawning transcoder");

        let mut child = command.spawn().map_err(crate::PipelineError::SpawnFailed)?;
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let last_stderr_line = Arc::new(Mutex::new(String::new()));
        spawn_stderr_drain(stderr, last_stderr_line.clone());

        Ok(Self { child, stdout, last_stderr_line })
    }

    pub fn stdout(&mut self) -> &mut (impl AsyncRead + Unpin) {
        &mut self.stdout
    }

    pub fn last_stderr_line(&self) -> String {
        self.last_stderr_line.lock().unwrap().clone()
    }

    /// Waits for the child to exit and returns its status code.
    pub async fn wait(&mut self) -> Option<i32> {
        self.child.wait().await.ok().and_then(|status| status.code())
    }

    pub async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

fn build_args(stream_url: &str) -> Vec<String> {
    [
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_delay_max",
        "5",
        "-loglevel",
        "error",
        "-i",
        stream_url,
        "-f",
        "s16le",
        "-ar",
        "48000",
        "-ac",
        "2",
        "-",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn spawn_stderr_drain(stderr: tokio::process::ChildStderr, last_line: Arc<Mutex<String>>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    *last_line.lock().unwrap() = line;
                }
                Ok(None) | Err(_) => break,
            }
        }
    });
}

/// Classifies a non-zero exit using whatever the stderr drain captured.
pub fn classify_exit(code: Option<i32>, last_stderr_line: &str) -> crate::PipelineError {
    let lower = last_stderr_line.to_lowercase();
    if lower.contains("403") || lower.contains("410") || lower.contains("forbidden") {
        crate::PipelineError::StreamExpired
    } else {
        crate::PipelineError::TranscoderExited {
            code,
            last_stderr_line: last_stderr_line.to_string(),
        }
    }
}
