use crate::priority::Priority;
use aural_song::Song;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Bound on the number of processing attempts before a song is marked
/// Failed outright.
pub const MAX_ATTEMPTS: u32 = 3;

/// Invoked with a 0-100 completion percentage as a task progresses;
/// called with 100 once the song reaches `Ready`.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Clone)]
pub struct ProcessingTask {
    pub task_id: Uuid,
    pub song: Song,
    pub priority: Priority,
    pub attempt: u32,
    pub max_attempts: u32,
    pub progress_callback: Option<ProgressCallback>,
}

impl ProcessingTask {
    pub fn new(song: Song, priority: Priority) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            song,
            priority,
            attempt: 0,
            max_attempts: MAX_ATTEMPTS,
            progress_callback: None,
        }
    }

    /// Attaches a progress callback, invoked on success with 100.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn report_progress(&self, percent: u8) {
        if let Some(callback) = &self.progress_callback {
            callback(percent);
        }
    }
}

impl fmt::Debug for ProcessingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingTask")
            .field("task_id", &self.task_id)
            .field("song", &self.song)
            .field("priority", &self.priority)
            .field("attempt", &self.attempt)
            .field("max_attempts", &self.max_attempts)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}
