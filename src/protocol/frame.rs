//! Outbound transport frame.
//!
//! Uses `bytes::Bytes` so a chunk can be a zero-copy slice of the
//! serialized envelope.
//!
//! # Example
//!
//! ```
//! use clubby_client::protocol::{OpCode, OutboundFrame};
//! use bytes::Bytes;
//!
//! let frame = OutboundFrame::new(OpCode::Binary, true, Bytes::from_static(b"hello"));
//!
//! assert!(frame.is_final());
//! assert_eq!(frame.payload(), b"hello");
//! ```

use bytes::Bytes;

use super::wire_format::OpCode;

/// One WebSocket data frame ready to be handed to a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Data opcode.
    pub opcode: OpCode,
    /// FIN bit.
    pub fin: bool,
    /// Payload bytes.
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Create a new frame.
    pub fn new(opcode: OpCode, fin: bool, payload: Bytes) -> Self {
        Self {
            opcode,
            fin,
            payload,
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Whether this frame ends its message.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.fin
    }

    /// Whether this frame continues a fragmented message.
    #[inline]
    pub fn is_continuation(&self) -> bool {
        self.opcode == OpCode::Continuation
    }

    /// First header byte as it appears on the wire.
    #[inline]
    pub fn header_byte(&self) -> u8 {
        self.opcode.header_byte(self.fin)
    }
}
