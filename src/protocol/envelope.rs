//! Outgoing protocol envelopes.
//!
//! An envelope is addressed by `src`/`dst`, authenticated by `key`, and
//! carries exactly one of a `cmds` array or a `resp` array:
//!
//! ```text
//! {"src": "device-1", "key": "...", "dst": "//api.cesanta.com",
//!  "cmds": [{"id": 1, "cmd": "/v1/Hello", "args": {...}}]}
//! {"src": "device-1", "key": "...", "dst": "//api.cesanta.com",
//!  "resp": [{"id": 7, "status": 0, "resp": {...}}]}
//! ```
//!
//! # Example
//!
//! ```
//! use clubby_client::protocol::{Command, Identity};
//!
//! let me = Identity::new("device-1", "psk");
//! let envelope = me.commands("//api.cesanta.com", vec![Command::with_id(1, "/v1/Hello")]);
//!
//! assert_eq!(envelope.src(), "device-1");
//! assert_eq!(envelope.cmds().unwrap().len(), 1);
//! assert!(envelope.resp().is_none());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids;

/// A command sent to the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation id.
    pub id: u64,
    /// Verb, e.g. `/v1/Hello`.
    pub cmd: String,
    /// Opaque arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Seconds the peer may take before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

impl Command {
    /// Create a command with an id from the process-wide generator.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self::with_id(ids::next_id(), cmd)
    }

    /// Create a command with an explicit id.
    pub fn with_id(id: u64, cmd: impl Into<String>) -> Self {
        Self {
            id,
            cmd: cmd.into(),
            args: None,
            timeout: None,
        }
    }

    /// Attach arguments.
    pub fn args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    /// Attach a timeout in seconds.
    pub fn timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

/// A response to a command received from the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the command being answered.
    pub id: u64,
    /// 0 on success, failure code otherwise.
    pub status: i64,
    /// Human-readable status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_msg: Option<String>,
    /// Result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp: Option<Value>,
}

impl Response {
    /// Successful response without payload.
    pub fn ok(id: u64) -> Self {
        Self {
            id,
            status: 0,
            status_msg: None,
            resp: None,
        }
    }

    /// Failed response.
    pub fn error(id: u64, status: i64, status_msg: impl Into<String>) -> Self {
        Self {
            id,
            status,
            status_msg: Some(status_msg.into()),
            resp: None,
        }
    }

    /// Attach a result payload.
    pub fn with_resp(mut self, resp: Value) -> Self {
        self.resp = Some(resp);
        self
    }
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    src: String,
    key: String,
    dst: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cmds: Option<Vec<Command>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resp: Option<Vec<Response>>,
}

impl Envelope {
    /// Envelope carrying commands.
    pub fn commands(
        src: impl Into<String>,
        dst: impl Into<String>,
        key: impl Into<String>,
        cmds: Vec<Command>,
    ) -> Self {
        Self {
            src: src.into(),
            key: key.into(),
            dst: dst.into(),
            cmds: Some(cmds),
            resp: None,
        }
    }

    /// Envelope carrying responses.
    pub fn responses(
        src: impl Into<String>,
        dst: impl Into<String>,
        key: impl Into<String>,
        resp: Vec<Response>,
    ) -> Self {
        Self {
            src: src.into(),
            key: key.into(),
            dst: dst.into(),
            cmds: None,
            resp: Some(resp),
        }
    }

    /// Sender id.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Destination id.
    pub fn dst(&self) -> &str {
        &self.dst
    }

    /// Pre-shared key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Commands, for a command envelope.
    pub fn cmds(&self) -> Option<&[Command]> {
        self.cmds.as_deref()
    }

    /// Responses, for a response envelope.
    pub fn resp(&self) -> Option<&[Response]> {
        self.resp.as_deref()
    }
}

/// The device's own address and credential, stamped on every envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Device id, used as `src`.
    pub device_id: String,
    /// Pre-shared key, used as `key`.
    pub device_psk: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(device_id: impl Into<String>, device_psk: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_psk: device_psk.into(),
        }
    }

    /// Command envelope from this device.
    pub fn commands(&self, dst: &str, cmds: Vec<Command>) -> Envelope {
        Envelope::commands(&self.device_id, dst, &self.device_psk, cmds)
    }

    /// Response envelope from this device.
    pub fn responses(&self, dst: &str, resp: Vec<Response>) -> Envelope {
        Envelope::responses(&self.device_id, dst, &self.device_psk, resp)
    }

    /// Envelope with a single response.
    pub fn response(&self, dst: &str, id: u64, status: i64, status_msg: Option<&str>) -> Envelope {
        let response = Response {
            id,
            status,
            status_msg: status_msg.map(str::to_string),
            resp: None,
        };
        self.responses(dst, vec![response])
    }
}
