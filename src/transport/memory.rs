//! In-memory transport that records everything sent through it.
//!
//! Used by the test suites and handy for driving the connection manager
//! without a network: the host feeds [`TransportEvent`]s by hand and
//! inspects what the manager pushed into its links.
//!
//! [`TransportEvent`]: super::TransportEvent

use std::sync::{Arc, Mutex, MutexGuard};

use super::{ConnectionId, Connector, Link};
use crate::config::TlsConfig;
use crate::error::{ClubbyError, Result};
use crate::protocol::{HandshakeRequest, OutboundFrame};

/// Bare link collecting outbound frames.
#[derive(Debug, Default)]
pub struct RecordingLink {
    /// Every frame sent, in order.
    pub frames: Vec<OutboundFrame>,
    /// Every handshake sent, in order.
    pub handshakes: Vec<HandshakeRequest>,
    /// Whether `close` was called.
    pub closed: bool,
}

impl Link for RecordingLink {
    fn send_handshake(&mut self, request: &HandshakeRequest) -> Result<()> {
        self.handshakes.push(request.clone());
        Ok(())
    }

    fn send_frame(&mut self, frame: OutboundFrame) -> Result<()> {
        self.frames.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Something a [`MemoryLink`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOp {
    /// Upgrade request.
    Handshake(HandshakeRequest),
    /// Data frame.
    Frame(OutboundFrame),
    /// Close after flush.
    Close,
}

#[derive(Debug, Default)]
struct MemoryState {
    connects: Vec<(ConnectionId, String)>,
    ops: Vec<(ConnectionId, LinkOp)>,
    refuse_connects: bool,
    fail_sends: bool,
}

/// Connector handing out [`MemoryLink`]s.
///
/// Clones share state, so a test can keep one clone to inspect and steer
/// the connector owned by the manager.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Create a connector that accepts every connect.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make subsequent connects fail immediately.
    pub fn refuse_connects(&self, refuse: bool) {
        self.state().refuse_connects = refuse;
    }

    /// Make every link refuse handshakes and frames.
    pub fn fail_sends(&self, fail: bool) {
        self.state().fail_sends = fail;
    }

    /// Connection attempts that produced a link, in order.
    pub fn connects(&self) -> Vec<(ConnectionId, String)> {
        self.state().connects.clone()
    }

    /// Everything any link was asked to do, in order.
    pub fn ops(&self) -> Vec<(ConnectionId, LinkOp)> {
        self.state().ops.clone()
    }

    /// Handshakes sent on any link.
    pub fn handshakes(&self) -> Vec<HandshakeRequest> {
        self.state()
            .ops
            .iter()
            .filter_map(|(_, op)| match op {
                LinkOp::Handshake(h) => Some(h.clone()),
                _ => None,
            })
            .collect()
    }

    /// Frames sent on any link.
    pub fn frames(&self) -> Vec<OutboundFrame> {
        self.state()
            .ops
            .iter()
            .filter_map(|(_, op)| match op {
                LinkOp::Frame(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    /// Connections whose link was closed.
    pub fn closed(&self) -> Vec<ConnectionId> {
        self.state()
            .ops
            .iter()
            .filter(|(_, op)| *op == LinkOp::Close)
            .map(|(conn, _)| *conn)
            .collect()
    }
}

impl Connector for MemoryConnector {
    type Link = MemoryLink;

    fn connect(
        &mut self,
        conn: ConnectionId,
        address: &str,
        _tls: Option<&TlsConfig>,
    ) -> Result<MemoryLink> {
        let mut state = self.state();
        if state.refuse_connects {
            return Err(ClubbyError::TransportConnectFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("refused connect to {}", address),
            )));
        }
        state.connects.push((conn, address.to_string()));
        Ok(MemoryLink {
            conn,
            state: self.state.clone(),
            closed: false,
        })
    }
}

/// Link produced by [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryLink {
    conn: ConnectionId,
    state: Arc<Mutex<MemoryState>>,
    closed: bool,
}

impl MemoryLink {
    fn record(&mut self, op: LinkOp) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if self.closed || state.fail_sends {
            return Err(ClubbyError::Transport(format!("{} is not writable", self.conn)));
        }
        state.ops.push((self.conn, op));
        Ok(())
    }
}

impl Link for MemoryLink {
    fn send_handshake(&mut self, request: &HandshakeRequest) -> Result<()> {
        self.record(LinkOp::Handshake(request.clone()))
    }

    fn send_frame(&mut self, frame: OutboundFrame) -> Result<()> {
        self.record(LinkOp::Frame(frame))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.ops.push((self.conn, LinkOp::Close));
        self.closed = true;
    }
}
