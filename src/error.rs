//! Error types for rsdtcpip.

use std::path::PathBuf;

use thiserror::Error;

use crate::caps::Caps;
use crate::library::{ReturnCode, SessionHandle};
use crate::pad::FlowError;
use crate::state::{State, StateChange};

/// Library initialization entry point that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// Library-wide initialization with the key storage directory.
    Common,
    /// Sink (decrypt role) initialization.
    Sink,
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitStage::Common => f.write_str("common init"),
            InitStage::Sink => f.write_str("sink init"),
        }
    }
}

/// Main error type for rsdtcpip operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The element has no property with this name.
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// The value is of the wrong type or out of range for the property.
    #[error("Invalid value for property {name}: {reason}")]
    InvalidPropertyValue { name: String, reason: String },

    /// The external library refused to initialize.
    #[error("Problems initializing DTCP-IP library ({stage}) with storage {storage_dir:?}, rc: {code}")]
    LibraryInit {
        stage: InitStage,
        storage_dir: PathBuf,
        code: ReturnCode,
    },

    /// The library is already initialized for another key storage directory.
    #[error("DTCP-IP library already initialized with storage {active:?}, refusing {requested:?}")]
    StorageConflict { active: PathBuf, requested: PathBuf },

    /// AKE or session setup with the peer failed.
    #[error("Problems opening session using host: {host}, port: {port}, rc: {code}")]
    SessionOpen {
        host: String,
        port: u16,
        code: ReturnCode,
    },

    /// No peer host was configured before activation.
    #[error("Peer host is not set")]
    MissingPeerHost,

    /// Closing a session failed. Never blocks a state change.
    #[error("Problems closing session {handle}, rc: {code}")]
    SessionClose { handle: SessionHandle, code: ReturnCode },

    /// The library could not decrypt a buffer.
    #[error("Failed decrypting in session {handle}, rc: {code}")]
    Decrypt { handle: SessionHandle, code: ReturnCode },

    /// Releasing library allocated cleartext failed.
    #[error("Failed to free cleartext, rc: {code}")]
    Free { code: ReturnCode },

    /// The requested transition does not start from the current state.
    #[error("Invalid state change {transition} while in state {current}")]
    InvalidStateChange {
        transition: StateChange,
        current: State,
    },

    /// Generic pad (de)activation during a state change failed.
    #[error("Pad activation failed: {0}")]
    PadActivation(FlowError),

    /// Downstream refused the capability description.
    #[error("Downstream refused caps {0}")]
    NotNegotiated(Caps),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML configuration could not be parsed.
    #[error("Config error: {0}")]
    ConfigError(#[from] serde_yaml::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error belongs to the configuration surface (property get/set).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownProperty(_) | Error::InvalidPropertyValue { .. } | Error::ConfigError(_)
        )
    }
}

/// Result type alias for rsdtcpip operations.
pub type Result<T> = std::result::Result<T, Error>;
