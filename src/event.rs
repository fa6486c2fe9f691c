//! Events delivered to the application.
//!
//! There is exactly one subscriber per connection manager: an
//! [`EventSink`]. Closures implement it directly:
//!
//! ```
//! use clubby_client::{Event, EventSink};
//!
//! let mut seen = Vec::new();
//! let mut sink = |event: Event| seen.push(event);
//! sink.on_event(Event::Connected);
//! drop(sink);
//! assert_eq!(seen, vec![Event::Connected]);
//! ```
//!
//! Payloads are owned. Raw JSON parts are `Bytes` slices of the inbound
//! frame, so keeping them costs a reference count, not a copy.

use std::collections::VecDeque;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A command received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Sender of the envelope; answer to this address.
    pub src: String,
    /// Correlation id to echo in the response.
    pub id: u64,
    /// Verb.
    pub cmd: String,
    /// The whole command element as raw JSON.
    pub body: Bytes,
}

impl Request {
    /// Deserialize the whole command element.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserialize the `args` member of the command, if any.
    pub fn args<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        #[derive(serde::Deserialize)]
        struct Args<T> {
            args: Option<T>,
        }
        let parsed: Args<T> = serde_json::from_slice(&self.body)?;
        Ok(parsed.args)
    }
}

/// A response to one of our commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Id of the command being answered.
    pub id: u64,
    /// 0 on success.
    pub status: i64,
    /// Human-readable status, when present as a string.
    pub status_msg: Option<String>,
    /// Result payload as raw JSON.
    pub resp: Option<Bytes>,
    /// The whole response element as raw JSON.
    pub body: Bytes,
}

impl Reply {
    /// Whether the peer reported success.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Deserialize the result payload, if any.
    pub fn resp_json<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.resp {
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
            None => Ok(None),
        }
    }
}

/// Everything the connection manager and the inbound dispatcher report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Outcome of the transport-level connect.
    NetConnect {
        /// Whether the socket came up.
        success: bool,
    },
    /// Handshake done; sends are accepted from now on.
    Connected,
    /// The connection is gone.
    Disconnected,
    /// Raw inbound frame, raised before it is decoded.
    Frame(Bytes),
    /// A command from the peer.
    Request(Request),
    /// A response from the peer.
    Response(Reply),
}

/// The single subscriber of a connection manager.
pub trait EventSink {
    /// Handle one event. Must not block.
    fn on_event(&mut self, event: Event);
}

impl<F> EventSink for F
where
    F: FnMut(Event),
{
    fn on_event(&mut self, event: Event) {
        self(event)
    }
}

/// Sink that buffers events for later retrieval.
///
/// Lets the application pull events and call back into the manager
/// between them, which a callback holding the manager borrowed cannot do.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest pending event.
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take all pending events.
    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}

impl EventSink for EventQueue {
    fn on_event(&mut self, event: Event) {
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn request(body: &'static str) -> Request {
        Request {
            src: "cloud".to_string(),
            id: 1,
            cmd: "/v1/Set".to_string(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_request_args() {
        let req = request(r#"{"id":1,"cmd":"/v1/Set","args":{"pin":2}}"#);
        let args: Option<Value> = req.args().unwrap();
        assert_eq!(args, Some(json!({ "pin": 2 })));

        let body: Value = req.body_json().unwrap();
        assert_eq!(body["cmd"], "/v1/Set");
    }

    #[test]
    fn test_request_without_args() {
        let req = request(r#"{"id":1,"cmd":"/v1/Set"}"#);
        let args: Option<Value> = req.args().unwrap();
        assert!(args.is_none());
    }

    #[test]
    fn test_reply_resp_json() {
        let reply = Reply {
            id: 3,
            status: 0,
            status_msg: None,
            resp: Some(Bytes::from_static(b"[1,2]")),
            body: Bytes::from_static(br#"{"id":3,"status":0,"resp":[1,2]}"#),
        };
        assert!(reply.is_success());
        let resp: Option<Vec<u8>> = reply.resp_json().unwrap();
        assert_eq!(resp, Some(vec![1, 2]));
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = EventQueue::new();
        queue.on_event(Event::NetConnect { success: true });
        queue.on_event(Event::Connected);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(Event::NetConnect { success: true }));
        assert_eq!(queue.drain(), vec![Event::Connected]);
        assert!(queue.is_empty());
    }
}
