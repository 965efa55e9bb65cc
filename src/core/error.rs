//! Error types for the alert core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// `enqueue` was handed a blank message
    #[error("alert message must not be empty")]
    EmptyMessage,

    /// Position text that matches none of the six anchors
    #[error("unknown display position: {0}")]
    InvalidPosition(String),

    /// Audio output could not be opened or fed
    #[error("audio output error: {0}")]
    Audio(String),

    /// Settings file I/O
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings (de)serialization
    #[error("settings format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Host runtime could not be built
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, Error>;
