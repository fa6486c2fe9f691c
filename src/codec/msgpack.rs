//! MsgPack codec using `rmp-serde`.
//!
//! This is the outbound encoding announced in the handshake extension
//! (`out=msgpack`). Inbound frames are always JSON.
//!
//! **Always use `to_vec_named`**: the broker reads envelopes as maps keyed
//! by field name (`src`, `dst`, `cmds`, ...), never as positional arrays.
//!
//! # Example
//!
//! ```
//! use clubby_client::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Hello {
//!     id: u64,
//!     cmd: String,
//! }
//!
//! let msg = Hello { id: 42, cmd: "/v1/Hello".to_string() };
//! let encoded = MsgPackCodec::encode(&msg).unwrap();
//! let decoded: Hello = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use crate::error::Result;

/// MessagePack codec for outgoing envelopes.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encoding name used in the `Sec-WebSocket-Extensions` header.
    pub const NAME: &'static str = "msgpack";

    /// Encode a value to MsgPack bytes (struct-as-map format).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// The device never receives MsgPack; this exists for tooling and tests
    /// that inspect what was put on the wire.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestCommand {
        id: u64,
        cmd: String,
        urgent: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = TestCommand {
            id: 7,
            cmd: "/v1/Ping".to_string(),
            urgent: true,
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: TestCommand = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_to_vec_named_produces_map_format() {
        let test = TestCommand {
            id: 1,
            cmd: "x".to_string(),
            urgent: false,
        };

        let encoded = MsgPackCodec::encode(&test).unwrap();

        // fixmap with 3 entries, not fixarray (0x93)
        assert_eq!(
            encoded[0], 0x83,
            "Expected fixmap with 3 elements, got {:02X}",
            encoded[0]
        );
    }

    #[test]
    fn test_json_value_passes_through() {
        let value = serde_json::json!({ "pin": 4, "level": [1, 0, 1], "label": null });
        let encoded = MsgPackCodec::encode(&value).unwrap();
        let decoded: serde_json::Value = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_none_encodes_as_nil() {
        let val: Option<i32> = None;
        let encoded = MsgPackCodec::encode(&val).unwrap();
        assert_eq!(encoded, vec![0xc0]);
    }

    #[test]
    fn test_envelope_is_map_keyed_by_name() {
        let envelope = crate::protocol::Envelope::commands("d", "//api", "k", Vec::new());
        let encoded = MsgPackCodec::encode(&envelope).unwrap();

        // fixmap(4): src, key, dst, cmds; resp is skipped
        assert_eq!(encoded[0], 0x84);
        assert_eq!(&encoded[1..5], &[0xa3, b's', b'r', b'c']);
        assert_eq!(&encoded[5..7], &[0xa1, b'd']);
        assert_eq!(&encoded[7..11], &[0xa3, b'k', b'e', b'y']);
        assert!(encoded.ends_with(&[0xa4, b'c', b'm', b'd', b's', 0x90]));
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<TestCommand> = MsgPackCodec::decode(b"\xc1not msgpack");
        assert!(result.is_err());
    }
}
