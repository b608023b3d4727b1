//! Wraps the external media extractor (a `yt-dlp`-equivalent) as
//! a child process invoked under a hard timeout. The interface is
//! substitutable: any binary that accepts a resource reference on argv
//! and writes the agreed JSON shape to stdout will do.

use crate::error::{Result, ResolverError};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Metadata plus a short-lived stream URL, as returned by a successful
/// resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub title: String,
    pub uploader: Option<String>,
    pub duration_seconds: Option<u32>,
    pub thumbnail_url: Option<String>,
    pub stream_url: String,
}

/// A single entry discovered while expanding a playlist reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntryRef {
    pub id: String,
    pub title: String,
}

/// Turns a user-supplied reference into metadata and a stream URL, and
/// expands playlist references into their child entries.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, original_input: &str) -> Result<Resolution>;
    async fn expand_playlist(&self, url: &str) -> Result<Vec<PlaylistEntryRef>>;
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Path to the extractor binary. Not assumed to be any specific tool.
    pub binary_path: String,
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `Resolve` implementation that shells out to the configured extractor
/// binary for every call.
pub struct ExternalExtractorResolver {
    config: ExtractorConfig,
}

impl ExternalExtractorResolver {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    async fn run_json(&self, args: &[&str]) -> Result<serde_json::Value> {
        let mut command = Command::new(&self.config.binary_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(binary = %self.config.binary_path, ?args, "spawning extractor");

        let child = command.spawn().map_err(|_| ResolverError::Unavailable)?;
        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| ResolverError::Timeout)?
            .map_err(anyhow::Error::from)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status, stderr = %stderr, "extractor exited non-zero");
            return Err(classify_failure(output.status.code(), &stderr));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolverError::ParseFailed(e.to_string()))
    }
}

fn classify_failure(exit_code: Option<i32>, stderr: &str) -> ResolverError {
    let lower = stderr.to_lowercase();
    if lower.contains("not found") || lower.contains("404") || lower.contains("unavailable video") {
        ResolverError::NotFound
    } else if lower.contains("rate") || lower.contains("429") || lower.contains("too many requests") {
        ResolverError::RateLimited
    } else if exit_code.is_none() {
        ResolverError::Unavailable
    } else {
        ResolverError::Internal(anyhow::anyhow!(
            "extractor exited with code {:?}: {}",
            exit_code,
            stderr.lines().next().unwrap_or_default()
        ))
    }
}

#[async_trait]
impl Resolve for ExternalExtractorResolver {
    async fn resolve(&self, original_input: &str) -> Result<Resolution> {
        let value = self.run_json(&["--dump-json", "--no-playlist", original_input]).await?;
        let raw: RawExtraction = serde_json::from_value(value)
            .map_err(|e| ResolverError::ParseFailed(e.to_string()))?;
        let stream_url = raw
            .best_audio_url
            .ok_or_else(|| ResolverError::ParseFailed("missing best_audio_url".to_string()))?;
        Ok(Resolution {
            title: raw.title,
            uploader: raw.uploader,
            duration_seconds: raw.duration_s,
            thumbnail_url: raw.thumbnail_url,
            stream_url,
        })
    }

    async fn expand_playlist(&self, url: &str) -> Result<Vec<PlaylistEntryRef>> {
        let value = self.run_json(&["--dump-json", "--flat-playlist", url]).await?;
        let entries: Vec<RawPlaylistEntry> = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| ResolverError::ParseFailed(e.to_string()))?,
            other => vec![serde_json::from_value(other)
                .map_err(|e| ResolverError::ParseFailed(e.to_string()))?],
        };
        Ok(entries
            .into_iter()
            .map(|e| PlaylistEntryRef { id: e.id, title: e.title })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    title: String,
    duration_s: Option<u32>,
    uploader: Option<String>,
    thumbnail_url: Option<String>,
    #[allow(dead_code)]
    webpage_url: Option<String>,
    best_audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylistEntry {
    id: String,
    title: String,
}
