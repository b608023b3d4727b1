//! Canonical key derivation: the same logical resource must
//! hash to the same cache key regardless of tracking parameters or case.

use url::Url;

/// Query parameters known to be tracking noise rather than identity.
const TRACKING_PARAMS: &[&str] = &[
    "si", "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content", "feature",
    "pp", "ab_channel",
];

/// Canonicalizes a user-supplied reference into a stable cache key.
///
/// URLs have tracking parameters stripped and their host lowercased; for
/// YouTube URLs the `v=` video id is extracted as the sole identity.
/// Anything that doesn't parse as a URL is treated as a search term: it is
/// trimmed, lowercased, and prefixed with `search:`.
pub fn canonicalize(input: &str) -> String {
    let trimmed = input.trim();
    match Url::parse(trimmed) {
        Ok(url) => canonicalize_url(&url),
        Err(_) => format!("search:{}", trimmed.to_lowercase()),
    }
}

fn canonicalize_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_lowercase();

    if is_youtube_host(&host) {
        if let Some(video_id) = youtube_video_id(url) {
            return format!("youtube:{video_id}");
        }
    }

    let mut cleaned = url.clone();
    cleaned.set_host(Some(&host)).ok();
    let filtered: Vec<(String, String)> = cleaned
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    cleaned.query_pairs_mut().clear();
    if filtered.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().extend_pairs(filtered);
    }
    cleaned.into()
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com" || host == "www.youtube.com" || host == "youtu.be" || host == "m.youtube.com"
}

fn youtube_video_id(url: &Url) -> Option<String> {
    if url.host_str() == Some("youtu.be") {
        return url.path_segments()?.next().map(str::to_string);
    }
    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tracking_params() {
        let key = canonicalize("https://www.youtube.com/watch?v=abc123&si=xyz&utm_source=share");
        assert_eq!(key, "youtube:abc123");
    }

    #[test]
    fn lowercases_host() {
        let key = canonicalize("https://WWW.YouTube.com/watch?v=abc123");
        assert_eq!(key, "youtube:abc123");
    }

    #[test]
    fn short_link_extracts_id() {
        let key = canonicalize("https://youtu.be/abc123?si=xyz");
        assert_eq!(key, "youtube:abc123");
    }

    #[test]
    fn search_term_is_trimmed_and_lowered() {
        let key = canonicalize("  Never Gonna Give You Up  ");
        assert_eq!(key, "search:never gonna give you up");
    }

    #[test]
    fn non_youtube_url_keeps_host_and_path() {
        let key = canonicalize("https://Example.com/Track?ref=abc&utm_source=x");
        assert!(key.starts_with("https://example.com/Track"));
        assert!(!key.contains("utm_source"));
        assert!(key.contains("ref=abc"));
    }

    #[test]
    fn same_input_is_idempotent() {
        let a = canonicalize("https://www.youtube.com/watch?v=abc123");
        let b = canonicalize("https://www.youtube.com/watch?v=abc123");
        assert_eq!(a, b);
    }
}
