use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,

    /// The engine's input channel has been closed.
    #[error("engine stopped")]
    Stopped,

    /// Config loading, saving or watching failed.
    #[error("Config error: {0}")]
    Config(#[from] config::Error),

    /// An action could not be dispatched.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// I/O failure while performing a system operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to perform a leaf action's external effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The helper process could not be started.
    #[error("Failed to launch {kind} '{value}': {message}")]
    Spawn {
        /// Action type.
        kind: String,
        /// Action payload.
        value: String,
        /// OS error text.
        message: String,
    },

    /// A `url` action whose value does not parse as a URI.
    #[error("Invalid URL '{value}': {message}")]
    InvalidUrl {
        /// Action payload.
        value: String,
        /// Parser error text.
        message: String,
    },

    /// An action type this build cannot perform.
    #[error("Unsupported action type '{kind}'")]
    Unsupported {
        /// Action type as written in the config.
        kind: String,
    },
}
