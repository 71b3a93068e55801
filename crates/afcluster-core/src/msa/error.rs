use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Outcome of a single failed HTTP attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum LocalSearchError {
    #[error("No local MMseqs2 binary is configured")]
    ToolNotConfigured,

    #[error(
        "Local MMseqs2 found, but no databases are configured. Set the primary database path (and optionally the environmental one)"
    )]
    NoDatabases,

    #[error("Failed to launch '{tool}': {source}", tool = tool.display())]
    Launch {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("MMseqs2 '{stage}' exited with {status}: {stderr}")]
    StageFailed {
        stage: &'static str,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Giving up on {operation} after {attempts} consecutive transport errors: {last}")]
    TransportExhausted {
        operation: &'static str,
        attempts: usize,
        last: String,
    },

    #[error(
        "MMseqs2 API is giving errors. Please confirm your input is a valid protein sequence. If the error persists, try again an hour later"
    )]
    RemoteJob,

    #[error("MMseqs2 API is undergoing maintenance. Please try again in a few minutes")]
    Maintenance,

    #[error("MSA server answered with status {status} but no ticket id")]
    MissingTicketId { status: String },

    #[error("Failed to extract result archive '{path}': {source}", path = path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Local search failed ({local}) and the remote fallback failed as well: {remote}")]
    BothFailed {
        local: LocalSearchError,
        remote: Box<FetchError>,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}
