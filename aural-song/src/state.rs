/// The song lifecycle: `Pending -> Processing -> {Ready, Failed}`, with a
/// `Ready -> Ready` self-loop for stream URL refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}
