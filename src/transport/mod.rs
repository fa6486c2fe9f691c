//! Transport module - the boundary between the protocol core and a socket.
//!
//! The core never touches a socket. It asks a [`Connector`] for a [`Link`],
//! pushes handshake requests and frames into that link, and is driven by
//! [`TransportEvent`]s that the host feeds back in, one at a time.
//!
//! - [`ws`] - tokio + `tokio-tungstenite` implementation
//! - [`memory`] - recording in-memory implementation

pub mod memory;
pub mod ws;

use std::fmt;

use bytes::Bytes;

use crate::config::TlsConfig;
use crate::error::Result;
use crate::protocol::{HandshakeRequest, OutboundFrame};

/// Tag tying transport events to the link that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Lifecycle and data events raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// TCP-level connect finished (successfully or not).
    Connect {
        /// Whether the socket is up.
        success: bool,
    },
    /// WebSocket handshake accepted by the peer.
    HandshakeDone,
    /// A complete (reassembled) data message from the peer.
    Frame(Bytes),
    /// The link is gone.
    Closed,
}

/// A transport event for a specific connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Connection that raised the event.
    pub conn: ConnectionId,
    /// What happened.
    pub kind: TransportEventKind,
}

impl TransportEvent {
    /// Create a new transport event.
    pub fn new(conn: ConnectionId, kind: TransportEventKind) -> Self {
        Self { conn, kind }
    }
}

/// Per-connection handle returned by a [`Connector`].
///
/// Every method must return without waiting on the network.
pub trait Link {
    /// Send the WebSocket upgrade request.
    fn send_handshake(&mut self, request: &HandshakeRequest) -> Result<()>;

    /// Send one transport frame.
    fn send_frame(&mut self, frame: OutboundFrame) -> Result<()>;

    /// Close once everything already queued has been flushed.
    fn close(&mut self);
}

/// Factory of links.
pub trait Connector {
    /// Link type produced by this connector.
    type Link: Link;

    /// Start a connection attempt.
    ///
    /// The outcome of the attempt arrives later as a
    /// [`TransportEventKind::Connect`] event tagged with `conn`. An `Err`
    /// here means the attempt could not even be started (bad address,
    /// unsupported scheme, ...).
    fn connect(
        &mut self,
        conn: ConnectionId,
        address: &str,
        tls: Option<&TlsConfig>,
    ) -> Result<Self::Link>;
}
