//! Wire-level constants and WebSocket opcodes.
//!
//! Only the two data opcodes the device ever sends are modelled:
//! ```text
//! ┌─────────────┬───────┬─────────────────────────────────────┐
//! │ Opcode      │ Value │ Used for                            │
//! ├─────────────┼───────┼─────────────────────────────────────┤
//! │ Binary      │ 0x2   │ first (or only) frame of a message  │
//! │ Continuation│ 0x0   │ every following frame               │
//! └─────────────┴───────┴─────────────────────────────────────┘
//! ```
//! The FIN bit is set on the last frame of a message only.

/// Subprotocol token sent in `Sec-WebSocket-Protocol`.
pub const SUBPROTOCOL: &str = "clubby.cesanta.com";

/// Request path of the WebSocket upgrade.
pub const HANDSHAKE_PATH: &str = "/";

/// Encoding the device accepts from the broker.
pub const INBOUND_ENCODING: &str = "json";

/// Default payload size of a single outbound transport frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024;

/// Default destination for commands addressed to the cloud backend.
pub const DEFAULT_BACKEND: &str = "//api.cesanta.com";

/// Data opcode of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// First frame of a binary message.
    Binary,
    /// Follow-up frame of a fragmented message.
    Continuation,
}

impl OpCode {
    /// RFC 6455 opcode value.
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            OpCode::Binary => 0x2,
            OpCode::Continuation => 0x0,
        }
    }

    /// First byte of the frame header (FIN bit + opcode).
    #[inline]
    pub fn header_byte(self, fin: bool) -> u8 {
        let fin_bit = if fin { 0x80 } else { 0x00 };
        fin_bit | self.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(OpCode::Binary.as_u8(), 0x2);
        assert_eq!(OpCode::Continuation.as_u8(), 0x0);
    }

    #[test]
    fn test_header_byte_fin_bit() {
        assert_eq!(OpCode::Binary.header_byte(true), 0x82);
        assert_eq!(OpCode::Binary.header_byte(false), 0x02);
        assert_eq!(OpCode::Continuation.header_byte(true), 0x80);
        assert_eq!(OpCode::Continuation.header_byte(false), 0x00);
    }
}
