use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor queue is at capacity")]
    QueueFull,
    #[error("processor is shutting down and rejects new work")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
