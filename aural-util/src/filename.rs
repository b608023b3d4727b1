//! Safe on-disk naming for per-tenant playlist files.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("playlist name is empty")]
    Empty,
    #[error("playlist name contains disallowed character '{0}'")]
    DisallowedChar(char),
}

/// Normalizes a user-supplied playlist name into a filesystem-safe stem.
///
/// Rejects any character outside `[A-Za-z0-9 _-]`, then substitutes spaces
/// with underscores. Does not append an extension.
pub fn safe_playlist_name(name: &str) -> Result<String, FilenameError> {
    if name.trim().is_empty() {
        return Err(FilenameError::Empty);
    }

    for c in name.chars() {
        let allowed = c.is_ascii_alphanumeric() || c == ' ' || c == '_' || c == '-';
        if !allowed {
            return Err(FilenameError::DisallowedChar(c));
        }
    }

    Ok(name.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_spaces() {
        assert_eq!(safe_playlist_name("road trip mix").unwrap(), "road_trip_mix");
    }

    #[test]
    fn allows_underscore_and_hyphen() {
        assert_eq!(safe_playlist_name("night-drive_v2").unwrap(), "night-drive_v2");
    }

    #[test]
    fn rejects_path_traversal() {
        assert_eq!(
            safe_playlist_name("../etc/passwd"),
            Err(FilenameError::DisallowedChar('.'))
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(safe_playlist_name("   "), Err(FilenameError::Empty));
    }
}
