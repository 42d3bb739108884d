use thiserror::Error;

/// Why a payment never made it into the dispatch queue, or why its caller
/// stopped waiting for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("correlation id {0} is already being processed")]
    DuplicateCorrelationId(String),
    #[error("admission queue stayed full for the whole admission timeout")]
    QueueFull,
    #[error("admission queue is closed")]
    QueueClosed,
    #[error("payment outcome not available within the admission timeout")]
    TimedOut,
}

/// A single failed outbound attempt against a processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("processor call timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("processor answered with status {0}")]
    Status(u16),
    #[error("malformed processor response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CallError::Timeout
        } else if e.is_decode() {
            CallError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            CallError::Status(status.as_u16())
        } else {
            CallError::Transport(e.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
}
