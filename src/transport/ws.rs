//! WebSocket transport on tokio + `tokio-tungstenite`.
//!
//! Each connection runs on its own task. The [`WsLink`] handed to the
//! manager only pushes commands into an unbounded channel, so nothing the
//! manager does waits on the socket. The task reports back through the
//! [`TransportEvent`] channel returned by [`WsConnector::new`]:
//!
//! ```text
//! manager ──WsLink──► mpsc<LinkCommand> ──► driver task ──► TcpStream
//!    ▲                                          │
//!    └──── handle_transport_event ◄── mpsc<TransportEvent>
//! ```
//!
//! Only plain `ws://` addresses are supported.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode as WsOpCode};
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::Message;

use super::{ConnectionId, Connector, Link, TransportEvent, TransportEventKind};
use crate::config::TlsConfig;
use crate::error::{ClubbyError, Result};
use crate::protocol::{HandshakeRequest, OpCode, OutboundFrame};

const DEFAULT_WS_PORT: u16 = 80;

/// Work queued for a driver task.
#[derive(Debug)]
enum LinkCommand {
    Handshake(HandshakeRequest),
    Frame(OutboundFrame),
    Close,
}

/// Connector spawning one tokio task per connection.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct WsConnector {
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WsConnector {
    /// Create a connector and the receiver its tasks report to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

impl Connector for WsConnector {
    type Link = WsLink;

    fn connect(
        &mut self,
        conn: ConnectionId,
        address: &str,
        tls: Option<&TlsConfig>,
    ) -> Result<WsLink> {
        if let Some(tls) = tls {
            return Err(refused(format!(
                "TLS to {} is not supported by this transport",
                tls.verify_name(address).unwrap_or_else(|| address.to_string())
            )));
        }

        let target = Target::parse(address)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| refused(format!("no tokio runtime: {}", e)))?;

        let (commands, rx) = mpsc::unbounded_channel();
        let events = self.events.clone();
        runtime.spawn(drive(conn, target, rx, events));

        Ok(WsLink {
            conn,
            commands,
            closed: false,
        })
    }
}

fn refused(msg: String) -> ClubbyError {
    ClubbyError::TransportConnectFailed(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        msg,
    ))
}

/// Handle to a connection driven by a [`WsConnector`] task.
#[derive(Debug)]
pub struct WsLink {
    conn: ConnectionId,
    commands: mpsc::UnboundedSender<LinkCommand>,
    closed: bool,
}

impl WsLink {
    fn push(&self, command: LinkCommand) -> Result<()> {
        if self.closed {
            return Err(ClubbyError::Transport(format!("{} is closed", self.conn)));
        }
        self.commands
            .send(command)
            .map_err(|_| ClubbyError::Transport(format!("{} is gone", self.conn)))
    }
}

impl Link for WsLink {
    fn send_handshake(&mut self, request: &HandshakeRequest) -> Result<()> {
        self.push(LinkCommand::Handshake(request.clone()))
    }

    fn send_frame(&mut self, frame: OutboundFrame) -> Result<()> {
        self.push(LinkCommand::Frame(frame))
    }

    fn close(&mut self) {
        if !self.closed {
            let _ = self.commands.send(LinkCommand::Close);
            self.closed = true;
        }
    }
}

/// Parsed `ws://` address.
#[derive(Debug)]
struct Target {
    request: Request,
    host: String,
    port: u16,
}

impl Target {
    fn parse(address: &str) -> Result<Self> {
        let request = address
            .into_client_request()
            .map_err(|e| refused(format!("bad address {}: {}", address, e)))?;

        let uri = request.uri();
        if uri.scheme_str() != Some("ws") {
            return Err(refused(format!("unsupported scheme in {}", address)));
        }
        let host = uri
            .host()
            .ok_or_else(|| refused(format!("no host in {}", address)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = uri.port_u16().unwrap_or(DEFAULT_WS_PORT);

        Ok(Self {
            request,
            host,
            port,
        })
    }
}

fn upgrade_request(mut request: Request, handshake: &HandshakeRequest) -> Result<Request> {
    for (name, value) in handshake.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClubbyError::Transport(e.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| ClubbyError::Transport(e.to_string()))?;
        request.headers_mut().insert(name, value);
    }
    Ok(request)
}

fn to_message(frame: OutboundFrame) -> Message {
    let opcode = match frame.opcode {
        OpCode::Binary => WsOpCode::Data(Data::Binary),
        OpCode::Continuation => WsOpCode::Data(Data::Continue),
    };
    Message::Frame(Frame::message(frame.payload, opcode, frame.fin))
}

async fn drive(
    conn: ConnectionId,
    target: Target,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent::new(conn, kind));
    };

    let stream = match TcpStream::connect((target.host.as_str(), target.port)).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("{}: connect to {}:{} failed: {}", conn, target.host, target.port, e);
            emit(TransportEventKind::Connect { success: false });
            return;
        }
    };
    emit(TransportEventKind::Connect { success: true });

    let handshake = loop {
        match commands.recv().await {
            Some(LinkCommand::Handshake(handshake)) => break handshake,
            Some(LinkCommand::Frame(_)) => {
                tracing::warn!("{}: dropping frame sent before the handshake", conn);
            }
            Some(LinkCommand::Close) | None => {
                emit(TransportEventKind::Closed);
                return;
            }
        }
    };

    let request = match upgrade_request(target.request, &handshake) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("{}: bad upgrade request: {}", conn, e);
            emit(TransportEventKind::Closed);
            return;
        }
    };

    let ws = match tokio_tungstenite::client_async(request, stream).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!("{}: websocket handshake failed: {}", conn, e);
            emit(TransportEventKind::Closed);
            return;
        }
    };
    emit(TransportEventKind::HandshakeDone);

    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(LinkCommand::Frame(frame)) => {
                    if let Err(e) = sink.send(to_message(frame)).await {
                        tracing::warn!("{}: send failed: {}", conn, e);
                        break;
                    }
                }
                Some(LinkCommand::Handshake(_)) => {
                    tracing::warn!("{}: handshake already done", conn);
                }
                Some(LinkCommand::Close) | None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Binary(data))) => emit(TransportEventKind::Frame(data)),
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEventKind::Frame(Bytes::copy_from_slice(text.as_str().as_bytes())))
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("{}: read failed: {}", conn, e);
                    break;
                }
            },
        }
    }

    tracing::debug!("{}: link closed", conn);
    emit(TransportEventKind::Closed);
}
