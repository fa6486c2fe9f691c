//! Protocol module - envelopes, handshake, outbound framing and ids.
//!
//! This module implements the device→broker half of the protocol:
//! - Envelope types and their serialization
//! - The WebSocket upgrade request (subprotocol + encodings)
//! - Fragmentation of serialized envelopes into transport frames
//! - Correlation id generation

mod envelope;
mod fragment;
mod frame;
mod handshake;
mod ids;
mod wire_format;

pub use envelope::{Command, Envelope, Identity, Response};
pub use fragment::{split_offsets, Fragmenter};
pub use frame::OutboundFrame;
pub use handshake::{HandshakeRequest, EXTENSIONS_HEADER, PROTOCOL_HEADER};
pub use ids::{next_id, IdGenerator};
pub use wire_format::{
    OpCode, DEFAULT_BACKEND, DEFAULT_MAX_FRAME_SIZE, HANDSHAKE_PATH, INBOUND_ENCODING, SUBPROTOCOL,
};
