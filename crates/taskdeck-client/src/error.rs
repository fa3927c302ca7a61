//! Client error types.

use std::{io, path::PathBuf};

use taskdeck_core::CommandError;
use thiserror::Error;

/// Errors returned by [`crate::Client::handle`].
///
/// Inbound server data never produces an error: unknown or irrelevant events
/// are dropped. Only rejected user commands surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A command failed its preconditions. Nothing was sent.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors loading the stored session record.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session file could not be read.
    #[error("cannot read session {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The record is not valid JSON or has the wrong shape.
    #[error("invalid session record: {0}")]
    Json(#[from] serde_json::Error),

    /// The record has no usable bearer token.
    #[error("session has no auth token")]
    MissingToken,
}
