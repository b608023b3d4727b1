//! Per-tenant ordered queue of songs: history, repeat modes, and
//! jump/skip semantics, serialized behind a single reader/writer lock.

mod repeat;

pub use repeat::RepeatMode;

use aural_song::Song;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use tokio::sync::RwLock;

const HISTORY_CAPACITY: usize = 50;

struct Core {
    songs: Vec<Song>,
    current_index: usize,
    history: VecDeque<Song>,
    repeat_mode: RepeatMode,
}

impl Core {
    fn push_history(&mut self, song: Song) {
        self.history.push_back(song);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }
}

/// A per-tenant ordered sequence of songs. All operations are serialized
/// by a single internal lock; the songs themselves are independently
/// synchronized so returned clones are safe to read concurrently.
pub struct Tracklist {
    core: RwLock<Core>,
}

impl Default for Tracklist {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracklist {
    pub fn new() -> Self {
        Self {
            core: RwLock::new(Core {
                songs: Vec::new(),
                current_index: 0,
                history: VecDeque::new(),
                repeat_mode: RepeatMode::None,
            }),
        }
    }

    /// Appends `song`, returning its 1-based position. If the tracklist
    /// was empty, `currentIndex` becomes 0.
    pub async fn add(&self, song: Song) -> usize {
        let mut core = self.core.write().await;
        let was_empty = core.songs.is_empty();
        core.songs.push(song);
        if was_empty {
            core.current_index = 0;
        }
        core.songs.len()
    }

    pub async fn current_song(&self) -> Option<Song> {
        let core = self.core.read().await;
        core.songs.get(core.current_index).cloned()
    }

    /// Advances according to the repeat mode, pushing the previous
    /// current song to history before leaving it (except under `Track`,
    /// which returns the same song unchanged).
    pub async fn next_song(&self) -> Option<Song> {
        let mut core = self.core.write().await;
        if core.songs.is_empty() {
            return None;
        }

        match core.repeat_mode {
            RepeatMode::Track => core.songs.get(core.current_index).cloned(),
            RepeatMode::Queue => {
                let previous = core.songs[core.current_index].clone();
                let next_index = if core.current_index + 1 < core.songs.len() {
                    core.current_index + 1
                } else {
                    0
                };
                core.push_history(previous);
                core.current_index = next_index;
                core.songs.get(core.current_index).cloned()
            }
            RepeatMode::None => {
                if core.current_index + 1 < core.songs.len() {
                    let previous = core.songs[core.current_index].clone();
                    core.push_history(previous);
                    core.current_index += 1;
                    core.songs.get(core.current_index).cloned()
                } else {
                    None
                }
            }
        }
    }

    /// Jumps to a 1-based position. Does not push history: an explicit
    /// jump is user navigation, not a natural end-of-track advance.
    pub async fn skip_to_position(&self, position: usize) -> Option<Song> {
        let mut core = self.core.write().await;
        if position == 0 || position > core.songs.len() {
            return None;
        }
        core.current_index = position - 1;
        core.songs.get(core.current_index).cloned()
    }

    /// Removes the 1-based position. Keeps `currentIndex` pointing at
    /// the same logical song (or the new last element if it was removed).
    pub async fn remove_song(&self, position: usize) -> bool {
        let mut core = self.core.write().await;
        if position == 0 || position > core.songs.len() {
            return false;
        }
        let index = position - 1;
        core.songs.remove(index);

        if core.songs.is_empty() {
            core.current_index = 0;
        } else if index < core.current_index {
            core.current_index -= 1;
        } else if index == core.current_index && core.current_index >= core.songs.len() {
            core.current_index = core.songs.len() - 1;
        }
        true
    }

    pub async fn clear(&self) {
        let mut core = self.core.write().await;
        core.songs.clear();
        core.history.clear();
        core.current_index = 0;
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        self.core.write().await.repeat_mode = mode;
    }

    pub async fn repeat_mode(&self) -> RepeatMode {
        self.core.read().await.repeat_mode
    }

    /// Snapshot of up to `limit` songs beginning right after the current
    /// position.
    pub async fn get_upcoming(&self, limit: usize) -> Vec<Song> {
        let core = self.core.read().await;
        core.songs
            .iter()
            .skip(core.current_index + 1)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn size(&self) -> usize {
        self.core.read().await.songs.len()
    }

    /// 1-based position of the current song, or 0 when empty.
    pub async fn position(&self) -> usize {
        let core = self.core.read().await;
        if core.songs.is_empty() {
            0
        } else {
            core.current_index + 1
        }
    }

    pub async fn history(&self) -> Vec<Song> {
        self.core.read().await.history.iter().cloned().collect()
    }

    /// Fisher-Yates shuffle over the segment strictly after the current
    /// song; the currently-playing entry is never moved.
    pub async fn shuffle(&self) {
        let mut core = self.core.write().await;
        if core.songs.len() <= core.current_index + 2 {
            return;
        }
        let tail = &mut core.songs[core.current_index + 1..];
        tail.shuffle(&mut rand::rng());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aural_song::SourceKind;

    fn song(label: &str) -> Song {
        Song::new(label, SourceKind::GenericUrl, "tester", "guild-1")
    }

    #[tokio::test]
    async fn add_to_empty_sets_current() {
        let tl = Tracklist::new();
        let s = song("a");
        let position = tl.add(s.clone()).await;
        assert_eq!(position, 1);
        assert_eq!(tl.current_song().await.unwrap().id(), s.id());
    }

    #[tokio::test]
    async fn next_song_none_mode_stops_at_end() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.add(song("b")).await;
        assert!(tl.next_song().await.is_some());
        assert!(tl.next_song().await.is_none());
    }

    #[tokio::test]
    async fn next_song_queue_mode_wraps() {
        let tl = Tracklist::new();
        let a = song("a");
        tl.add(a.clone()).await;
        tl.add(song("b")).await;
        tl.set_repeat_mode(RepeatMode::Queue).await;
        tl.next_song().await;
        let wrapped = tl.next_song().await.unwrap();
        assert_eq!(wrapped.id(), a.id());
    }

    #[tokio::test]
    async fn next_song_track_mode_repeats_current() {
        let tl = Tracklist::new();
        let a = song("a");
        tl.add(a.clone()).await;
        tl.set_repeat_mode(RepeatMode::Track).await;
        let again = tl.next_song().await.unwrap();
        assert_eq!(again.id(), a.id());
        assert_eq!(tl.position().await, 1);
    }

    #[tokio::test]
    async fn history_bounded_at_fifty() {
        let tl = Tracklist::new();
        tl.set_repeat_mode(RepeatMode::Queue).await;
        for i in 0..60 {
            tl.add(song(&format!("s{i}"))).await;
        }
        for _ in 0..59 {
            tl.next_song().await;
        }
        assert!(tl.history().await.len() <= 50);
    }

    #[tokio::test]
    async fn skip_to_position_does_not_push_history() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.add(song("b")).await;
        tl.add(song("c")).await;
        tl.skip_to_position(3).await;
        assert!(tl.history().await.is_empty());
        assert_eq!(tl.position().await, 3);
    }

    #[tokio::test]
    async fn skip_out_of_range_fails_silently() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        assert!(tl.skip_to_position(5).await.is_none());
        assert_eq!(tl.position().await, 1);
    }

    #[tokio::test]
    async fn remove_before_current_shifts_index() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.add(song("b")).await;
        tl.add(song("c")).await;
        tl.skip_to_position(3).await;
        tl.remove_song(1).await;
        assert_eq!(tl.position().await, 2);
    }

    #[tokio::test]
    async fn remove_current_clamps_to_new_last() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.add(song("b")).await;
        tl.skip_to_position(2).await;
        tl.remove_song(2).await;
        assert_eq!(tl.position().await, 1);
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.clear().await;
        assert_eq!(tl.size().await, 0);
        assert!(tl.current_song().await.is_none());
        assert!(tl.history().await.is_empty());
    }

    #[tokio::test]
    async fn get_upcoming_starts_after_current() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.add(song("b")).await;
        tl.add(song("c")).await;
        let upcoming = tl.get_upcoming(10).await;
        assert_eq!(upcoming.len(), 2);
    }

    #[tokio::test]
    async fn shuffle_preserves_current_and_multiset() {
        let tl = Tracklist::new();
        let current = song("current");
        tl.add(current.clone()).await;
        for i in 0..20 {
            tl.add(song(&format!("s{i}"))).await;
        }
        tl.shuffle().await;
        assert_eq!(tl.current_song().await.unwrap().id(), current.id());
        assert_eq!(tl.size().await, 21);
    }

    #[tokio::test]
    async fn repeat_mode_scenario_matrix() {
        let tl = Tracklist::new();
        tl.add(song("a")).await;
        tl.add(song("b")).await;
        let c = song("c");
        tl.add(c.clone()).await;
        tl.skip_to_position(3).await;

        tl.set_repeat_mode(RepeatMode::None).await;
        assert!(tl.next_song().await.is_none());
    }
}
