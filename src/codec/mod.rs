//! Codec module - serialization for outgoing payloads.
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`)
//!
//! # Design
//!
//! Codecs are implemented as marker structs with static methods rather than
//! trait objects. The outbound encoding is fixed for the lifetime of a
//! connection because it is negotiated once, in the handshake.

mod msgpack;

pub use msgpack::MsgPackCodec;
