/// Governs how `Tracklist::next_song` behaves at end of queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    None,
    Track,
    Queue,
}
