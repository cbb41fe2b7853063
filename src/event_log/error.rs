use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the event log.
///
/// Sink write failures never appear here: they stay inside the writer task
/// and are only visible through [`super::EventLogStats`] and the error hook.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open log sink {}: {source}", .path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("event log is not initialized")]
    NotInitialized,

    #[error("event log queue is full")]
    QueueFull,

    #[error("event log was already initialized")]
    AlreadyInitialized,

    #[error("failed to start event log writer: {0}")]
    WriterUnavailable(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;
