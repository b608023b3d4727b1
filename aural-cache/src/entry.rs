use aural_resolver::Resolution;
use chrono::{DateTime, Utc};

/// A resolved lookup, keyed by canonical resource identifier in the
/// owning `Cache`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResolution {
    pub title: String,
    pub uploader: Option<String>,
    pub duration_seconds: Option<u32>,
    pub thumbnail_url: Option<String>,
    pub stream_url: String,
    pub resolved_at: DateTime<Utc>,
    pub hit_count: u64,
    pub last_access: DateTime<Utc>,
    pub size_bytes: u64,
}

impl CachedResolution {
    pub(crate) fn from_resolution(resolution: Resolution) -> Self {
        let size_bytes = estimate_size(&resolution);
        let now = Utc::now();
        Self {
            title: resolution.title,
            uploader: resolution.uploader,
            duration_seconds: resolution.duration_seconds,
            thumbnail_url: resolution.thumbnail_url,
            stream_url: resolution.stream_url,
            resolved_at: now,
            hit_count: 0,
            last_access: now,
            size_bytes,
        }
    }
}

/// Cheap proxy for memory footprint: the string fields dominate, and
/// there is no file payload to measure (unlike a file-backed cache).
fn estimate_size(resolution: &Resolution) -> u64 {
    let mut total = resolution.title.len() + resolution.stream_url.len();
    total += resolution.uploader.as_ref().map_or(0, |s| s.len());
    total += resolution.thumbnail_url.as_ref().map_or(0, |s| s.len());
    total as u64
}
