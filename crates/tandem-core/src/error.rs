use crate::types::ConnectionId;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TandemError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error at byte {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("No changeset session for connection {0}")]
    NoActiveSession(ConnectionId),

    #[error("Column metadata error: {0}")]
    Metadata(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Backup {phase} error: {message}")]
    Backup { phase: BackupPhase, message: String },

    #[error("Restore error: {0}")]
    Restore(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl TandemError {
    /// Build a parse error anchored at a byte offset of the input.
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::Parse {
            message: message.into(),
            offset,
        }
    }

    /// Attach a snapshot phase to an error.
    ///
    /// Errors that already carry a phase are returned unchanged so the first
    /// failing phase is the one reported.
    pub fn in_phase(self, phase: BackupPhase) -> Self {
        match self {
            err @ (Self::Backup { .. } | Self::Cancelled | Self::DeadlineExceeded) => err,
            other => Self::Backup {
                phase,
                message: other.to_string(),
            },
        }
    }

    pub fn is_no_active_session(&self) -> bool {
        matches!(self, Self::NoActiveSession(_))
    }
}

/// Phase of a snapshot export, reported in [`TandemError::Backup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    Serialize,
    TempFile,
    Open,
    Step,
    Finish,
    Close,
    Copy,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupPhase::Serialize => "serialize",
            BackupPhase::TempFile => "temp-file",
            BackupPhase::Open => "open",
            BackupPhase::Step => "step",
            BackupPhase::Finish => "finish",
            BackupPhase::Close => "close",
            BackupPhase::Copy => "copy",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, TandemError>;
