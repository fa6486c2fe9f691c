//! Error types for clubby-client.

use thiserror::Error;

/// Main error type for all clubby operations.
#[derive(Debug, Error)]
pub enum ClubbyError {
    /// `connect()` was called while a connection already exists.
    #[error("Already connected")]
    AlreadyConnected,

    /// A send was attempted before the protocol handshake completed.
    #[error("Not connected")]
    NotConnected,

    /// The transport could not even start a connection attempt.
    #[error("Transport connect failed: {0}")]
    TransportConnectFailed(#[source] std::io::Error),

    /// Inbound frame is not valid JSON or its top level is not an object.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A command or response element is missing a required field.
    #[error("Malformed element: {0}")]
    MalformedElement(String),

    /// A new message was started while a fragmented one is still open.
    #[error("Fragmented message already in flight")]
    FragmentationInProgress,

    /// Chunk boundaries must be strictly increasing offsets inside the payload.
    #[error("Invalid chunk boundary {offset} for payload of {len} bytes")]
    InvalidChunkBoundary {
        /// Offending offset.
        offset: usize,
        /// Payload length.
        len: usize,
    },

    /// The link refused a frame or has already gone away.
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type alias using ClubbyError.
pub type Result<T> = std::result::Result<T, ClubbyError>;
