//! Error types for the chat server
//!
//! Defines session-fatal errors, outbound send errors and the typed
//! rejection returned by name registration.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::codec::CodecError;

/// Application-level errors
///
/// Every variant is fatal to the session that hit it, never to the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error, including over-long lines (fatal)
    #[error("Line codec error: {0}")]
    Codec(#[from] CodecError),

    /// Channel send error (fatal - chat server or outbound queue gone)
    #[error("Channel send error")]
    ChannelSend,

    /// The client stopped reading and its outbound queue filled up
    #[error("Outbound queue full")]
    SlowReader,
}

impl From<SendError> for AppError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::ChannelClosed => AppError::ChannelSend,
            SendError::QueueFull => AppError::SlowReader,
        }
    }
}

/// Message send errors
///
/// Occurs when attempting to queue messages for a client.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its queue
    #[error("Queue full")]
    QueueFull,
}

/// Why a name could not be claimed
///
/// Recovered locally: the session reports it and stays in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Empty or contains characters outside `[A-Za-z0-9_]`
    #[error("Invalid name")]
    InvalidName,

    /// Held by another participant, or reserved
    #[error("Name taken")]
    NameTaken,
}
