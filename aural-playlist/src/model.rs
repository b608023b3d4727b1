//! On-disk shape of a saved playlist, matched field-for-field so an
//! existing file round-trips through `Save`/`Load` unchanged.

use aural_song::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub original_input: String,
    pub source_type: SourceKind,
    pub title: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub entries: Vec<PlaylistEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { name: name.into(), entries: Vec::new(), created_at: now, updated_at: now }
    }

    /// No-op if an entry with the same `original_input` is already
    /// present: entries are unique by source within a playlist.
    pub fn push(&mut self, entry: PlaylistEntry) {
        if self.entries.iter().any(|existing| existing.original_input == entry.original_input) {
            return;
        }
        self.entries.push(entry);
        self.updated_at = Utc::now();
    }

    /// Removes entries at the given 1-based, descending-sorted indexes.
    /// Callers are expected to have already applied the indexes-parser
    /// invariant (sorted descending, deduplicated) so removal never
    /// shifts an index out from under a later one.
    pub fn remove_indexes(&mut self, indexes_descending: &[usize]) {
        for &index in indexes_descending {
            if index >= 1 && index <= self.entries.len() {
                self.entries.remove(index - 1);
            }
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(input: &str) -> PlaylistEntry {
        PlaylistEntry {
            original_input: input.to_string(),
            source_type: SourceKind::YouTube,
            title: input.to_string(),
            added_at: Utc::now(),
        }
    }

    #[test]
    fn remove_indexes_descending_keeps_remaining_order() {
        let mut playlist = Playlist::new("mix");
        playlist.push(entry("a"));
        playlist.push(entry("b"));
        playlist.push(entry("c"));
        playlist.remove_indexes(&[3, 1]);
        assert_eq!(playlist.entries.len(), 1);
        assert_eq!(playlist.entries[0].original_input, "b");
    }

    #[test]
    fn remove_entire_playlist_leaves_it_empty() {
        let mut playlist = Playlist::new("mix");
        playlist.push(entry("a"));
        playlist.push(entry("b"));
        playlist.remove_indexes(&[2, 1]);
        assert!(playlist.entries.is_empty());
    }

    #[test]
    fn push_ignores_duplicate_original_input() {
        let mut playlist = Playlist::new("mix");
        playlist.push(entry("a"));
        playlist.push(entry("a"));
        assert_eq!(playlist.entries.len(), 1);
    }

    #[test]
    fn source_type_serializes_without_variant_name() {
        let json = serde_json::to_string(&SourceKind::YouTube).unwrap();
        assert_eq!(json, "\"youtube\"");
    }
}
