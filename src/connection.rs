//! Connection manager - the single protocol connection and its lifecycle.
//!
//! ```text
//!            connect()          Connect{ok}          HandshakeDone
//!   Idle ───────────────► Connecting ───────► TransportUp ───────► AppConnected
//!    ▲                        │                    │                   │
//!    │    Connect{failed}     │                    │      Closed       │
//!    └────────────────────────┘                    └─────────┬─────────┘
//!                                                            ▼
//!                                               Idle (Disconnected raised)
//! ```
//!
//! The manager is a synchronous state machine. It never touches a socket:
//! it asks its [`Connector`] for a [`Link`] and is advanced by the
//! [`TransportEvent`]s the host feeds into
//! [`handle_transport_event`](ConnectionManager::handle_transport_event).
//! Every event is tagged with the [`ConnectionId`] of the link that raised
//! it; events from a link that is no longer the live one are ignored.

use bytes::Bytes;

use crate::codec::MsgPackCodec;
use crate::config::ClientConfig;
use crate::error::{ClubbyError, Result};
use crate::event::{Event, EventSink};
use crate::inbound::on_raw_frame;
use crate::protocol::{self, Command, Envelope, Fragmenter, HandshakeRequest, Identity, Response};
use crate::transport::{ConnectionId, Connector, Link, TransportEvent, TransportEventKind};

/// Lifecycle of the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the transport connect result.
    Connecting,
    /// Socket up, handshake sent.
    TransportUp,
    /// Handshake accepted; sends are allowed.
    AppConnected,
}

struct Connection<L> {
    id: ConnectionId,
    link: L,
    state: ConnectionState,
    fragmenter: Fragmenter,
}

/// Owner of the one protocol connection.
pub struct ConnectionManager<C: Connector, S: EventSink> {
    connector: C,
    sink: S,
    config: ClientConfig,
    identity: Identity,
    conn: Option<Connection<C::Link>>,
    last_conn_id: u64,
}

impl<C: Connector, S: EventSink> ConnectionManager<C, S> {
    /// Create an idle manager.
    pub fn new(connector: C, config: ClientConfig, sink: S) -> Self {
        let identity = config.identity();
        Self {
            connector,
            sink,
            config,
            identity,
            conn: None,
            last_conn_id: 0,
        }
    }

    /// Start connecting to the configured server.
    ///
    /// The outcome is reported later through [`Event::NetConnect`]. If the
    /// connector fails immediately, `NetConnect { success: false }` is
    /// raised before this returns and no connection is kept.
    ///
    /// # Errors
    ///
    /// [`ClubbyError::AlreadyConnected`] if a connection exists, in any
    /// state. The existing connection is left untouched.
    pub fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(ClubbyError::AlreadyConnected);
        }

        self.last_conn_id += 1;
        let id = ConnectionId(self.last_conn_id);
        let address = self.config.server_address.as_str();
        tracing::debug!("connecting to {} ({})", address, id);

        match self.connector.connect(id, address, self.config.tls.as_ref()) {
            Ok(link) => {
                self.conn = Some(Connection {
                    id,
                    link,
                    state: ConnectionState::Connecting,
                    fragmenter: Fragmenter::new(),
                });
            }
            Err(e) => {
                tracing::error!("cannot connect to {}: {}", address, e);
                self.sink.on_event(Event::NetConnect { success: false });
            }
        }
        Ok(())
    }

    /// Drop the connection, closing the link once queued frames are flushed.
    ///
    /// No event is raised. Does nothing when there is no connection.
    pub fn disconnect(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            tracing::debug!("disconnecting {}", conn.id);
            conn.link.close();
        }
    }

    /// Whether the handshake completed on the live connection.
    pub fn is_connected(&self) -> bool {
        self.state() == Some(ConnectionState::AppConnected)
    }

    /// State of the live connection, if any.
    pub fn state(&self) -> Option<ConnectionState> {
        self.conn.as_ref().map(|c| c.state)
    }

    /// Id of the live connection, if any.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.conn.as_ref().map(|c| c.id)
    }

    /// Advance the state machine with one transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        let conn = match self.conn.as_mut() {
            Some(conn) if conn.id == event.conn => conn,
            _ => {
                tracing::debug!("ignoring {:?} from stale {}", event.kind, event.conn);
                return;
            }
        };

        match event.kind {
            TransportEventKind::Connect { success: true } => {
                if conn.state != ConnectionState::Connecting {
                    tracing::warn!("unexpected connect on {} in {:?}", conn.id, conn.state);
                    return;
                }
                tracing::debug!("CONNECT (1) {}", conn.id);
                conn.state = ConnectionState::TransportUp;
                self.sink.on_event(Event::NetConnect { success: true });

                let request = HandshakeRequest::new(MsgPackCodec::NAME);
                if let Err(e) = conn.link.send_handshake(&request) {
                    tracing::error!("handshake on {} failed: {}", conn.id, e);
                    conn.link.close();
                    self.conn = None;
                    self.sink.on_event(Event::Disconnected);
                }
            }
            TransportEventKind::Connect { success: false } => {
                tracing::debug!("CONNECT (0) {}", conn.id);
                self.conn = None;
                self.sink.on_event(Event::NetConnect { success: false });
            }
            TransportEventKind::HandshakeDone => {
                if conn.state != ConnectionState::TransportUp {
                    tracing::warn!("unexpected handshake on {} in {:?}", conn.id, conn.state);
                    return;
                }
                tracing::debug!("HANDSHAKE DONE {}", conn.id);
                conn.state = ConnectionState::AppConnected;
                self.sink.on_event(Event::Connected);
            }
            TransportEventKind::Frame(frame) => {
                on_raw_frame(frame, &mut self.sink);
            }
            TransportEventKind::Closed => {
                tracing::debug!("CLOSE {}", conn.id);
                self.conn = None;
                self.sink.on_event(Event::Disconnected);
            }
        }
    }

    /// Serialize an envelope and send it, fragmented to `max_frame_size`.
    ///
    /// # Errors
    ///
    /// - [`ClubbyError::NotConnected`] before the handshake completed
    /// - [`ClubbyError::FragmentationInProgress`] if a message is half sent
    /// - encoding and link errors
    pub fn send(&mut self, envelope: &Envelope) -> Result<()> {
        let max_frame_size = self.config.max_frame_size;
        let conn = self.live()?;
        let payload = Bytes::from(MsgPackCodec::encode(envelope)?);
        tracing::debug!("sending envelope to {} ({} bytes)", envelope.dst(), payload.len());
        conn.fragmenter
            .send_message(&mut conn.link, payload, max_frame_size)
    }

    /// Send already serialized bytes split at explicit offsets.
    ///
    /// See [`Fragmenter::fragment_and_send`].
    pub fn send_payload(&mut self, payload: Bytes, boundaries: &[usize]) -> Result<()> {
        let conn = self.live()?;
        conn.fragmenter
            .fragment_and_send(&mut conn.link, payload, boundaries)
    }

    /// Send commands from this device to `dst`.
    pub fn send_commands(&mut self, dst: &str, cmds: Vec<Command>) -> Result<()> {
        let envelope = self.identity.commands(dst, cmds);
        self.send(&envelope)
    }

    /// Send one command to the configured backend and return its id.
    pub fn call(&mut self, cmd: Command) -> Result<u64> {
        let id = cmd.id;
        let envelope = self.identity.commands(&self.config.backend, vec![cmd]);
        self.send(&envelope)?;
        Ok(id)
    }

    /// Send one response to `dst`.
    pub fn send_response(&mut self, dst: &str, response: Response) -> Result<()> {
        let envelope = self.identity.responses(dst, vec![response]);
        self.send(&envelope)
    }

    /// Next correlation id from the process-wide generator.
    pub fn next_id(&self) -> u64 {
        protocol::next_id()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Identity stamped on outgoing envelopes.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable event sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn live(&mut self) -> Result<&mut Connection<C::Link>> {
        match self.conn.as_mut() {
            Some(conn) if conn.state == ConnectionState::AppConnected => Ok(conn),
            _ => Err(ClubbyError::NotConnected),
        }
    }
}
