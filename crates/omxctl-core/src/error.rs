//! Error types for the control core
use crate::command::CommandKind;
use thiserror::Error;

/// A single failed round-trip on the command channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("IPC call '{command}' failed: {reason}")]
pub struct IpcFailure {
    /// Wire form of the command that failed
    pub command: String,
    /// Transport-provided reason
    pub reason: String,
}

impl IpcFailure {
    /// Create a failure for a command
    pub fn new(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Control core errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Transient transport or process error
    #[error(transparent)]
    Ipc(#[from] IpcFailure),

    /// Retry budget spent for a command kind
    #[error("IPC retries exhausted for {kind} after {attempts} attempts")]
    IpcExhausted {
        /// Command kind whose budget was spent
        kind: CommandKind,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Player never answered during startup confirmation
    #[error("Player did not confirm startup after {attempts} attempts")]
    StartupTimeout {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Operation conflicts with a session that is launching or active
    #[error("Session busy: a session is already launching or active")]
    SessionBusy,

    /// Player process went away before startup was confirmed
    #[error("Player process exited before startup was confirmed")]
    ProcessExited,

    /// Session was stopped or quit before startup was confirmed
    #[error("Session ended before startup was confirmed")]
    SessionEnded,

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reply text could not be decoded
    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    /// Player process could not be launched
    #[error("Launch error: {0}")]
    Launch(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
