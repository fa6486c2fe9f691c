//! WebSocket upgrade request for the clubby subprotocol.
//!
//! Sent by the connection manager as soon as the socket is up. It tells the
//! broker:
//! - The subprotocol (`Sec-WebSocket-Protocol`)
//! - The encodings in each direction (`Sec-WebSocket-Extensions`)
//!
//! # Example
//!
//! ```
//! use clubby_client::protocol::HandshakeRequest;
//!
//! let request = HandshakeRequest::new("msgpack");
//! assert_eq!(
//!     request.extensions,
//!     "clubby.cesanta.com-encoding; in=json; out=msgpack"
//! );
//! ```

use super::wire_format::{HANDSHAKE_PATH, INBOUND_ENCODING, SUBPROTOCOL};

/// Header carrying the subprotocol token.
pub const PROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// Header carrying the encoding extension.
pub const EXTENSIONS_HEADER: &str = "Sec-WebSocket-Extensions";

/// Upgrade request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request path.
    pub path: String,
    /// Subprotocol token.
    pub protocol: String,
    /// Extension string declaring the encodings.
    pub extensions: String,
}

impl HandshakeRequest {
    /// Build the request announcing `out_encoding` for device→broker traffic.
    pub fn new(out_encoding: &str) -> Self {
        Self {
            path: HANDSHAKE_PATH.to_string(),
            protocol: SUBPROTOCOL.to_string(),
            extensions: format!(
                "{}-encoding; in={}; out={}",
                SUBPROTOCOL, INBOUND_ENCODING, out_encoding
            ),
        }
    }

    /// Extra headers to add to the upgrade request, in order.
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            (PROTOCOL_HEADER, self.protocol.as_str()),
            (EXTENSIONS_HEADER, self.extensions.as_str()),
        ]
    }
}
