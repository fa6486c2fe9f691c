//! Client builder and async event loop.
//!
//! The [`ClientBuilder`] provides a fluent API for the configuration. The
//! [`Client`] ties a [`ConnectionManager`] to the tokio WebSocket transport:
//! 1. `connect()` starts the socket task
//! 2. `next_event()` feeds transport events into the manager and yields
//!    the application events it raises, one at a time
//! 3. between events the application sends commands and responses
//!
//! Reconnecting is up to the caller: on [`Event::Disconnected`] or a failed
//! [`Event::NetConnect`], call `connect()` again.
//!
//! # Example
//!
//! ```no_run
//! use clubby_client::{Client, Event, Response};
//!
//! #[tokio::main]
//! async fn main() -> clubby_client::Result<()> {
//!     let mut client = Client::builder("ws://127.0.0.1:8000", "device-1", "psk")
//!         .max_frame_size(512)
//!         .start()
//!         .await?;
//!
//!     while let Some(event) = client.next_event().await {
//!         if let Event::Request(req) = event {
//!             client.respond(&req, Response::ok(req.id))?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use tokio::sync::mpsc;

use crate::config::{ClientConfig, TlsConfig};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::event::{Event, EventQueue, Request};
use crate::protocol::{Command, Envelope, Response};
use crate::transport::ws::WsConnector;
use crate::transport::TransportEvent;

/// Builder for configuring and creating a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a builder with default settings for everything optional.
    pub fn new(
        server_address: impl Into<String>,
        device_id: impl Into<String>,
        device_psk: impl Into<String>,
    ) -> Self {
        Self {
            config: ClientConfig::new(server_address, device_id, device_psk),
        }
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the largest frame payload.
    ///
    /// Envelopes that serialize to more bytes are fragmented.
    /// 0 disables fragmentation. Default: 1024
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the destination used by [`Client::call`].
    ///
    /// Default: `//api.cesanta.com`
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.config.backend = backend.into();
        self
    }

    /// Set TLS parameters.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.config.tls = Some(tls);
        self
    }

    /// Build an idle client.
    ///
    /// Must be called from within a tokio runtime before connecting.
    pub fn build(self) -> Client {
        Client::new(self.config)
    }

    /// Build the client and start connecting.
    pub async fn start(self) -> Result<Client> {
        let mut client = self.build();
        client.connect()?;
        Ok(client)
    }
}

/// A protocol client running over tokio.
pub struct Client {
    manager: ConnectionManager<WsConnector, EventQueue>,
    transport: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder(
        server_address: impl Into<String>,
        device_id: impl Into<String>,
        device_psk: impl Into<String>,
    ) -> ClientBuilder {
        ClientBuilder::new(server_address, device_id, device_psk)
    }

    /// Create an idle client.
    pub fn new(config: ClientConfig) -> Self {
        let (connector, transport) = WsConnector::new();
        Self {
            manager: ConnectionManager::new(connector, config, EventQueue::new()),
            transport,
        }
    }

    /// Start connecting. See [`ConnectionManager::connect`].
    pub fn connect(&mut self) -> Result<()> {
        self.manager.connect()
    }

    /// Drop the connection. See [`ConnectionManager::disconnect`].
    pub fn disconnect(&mut self) {
        self.manager.disconnect()
    }

    /// Whether the handshake completed.
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Wait for the next application event.
    ///
    /// Cancel safe: dropping the future loses nothing.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.manager.sink_mut().pop() {
                return Some(event);
            }
            let event = self.transport.recv().await?;
            self.manager.handle_transport_event(event);
        }
    }

    /// Send an envelope.
    pub fn send(&mut self, envelope: &Envelope) -> Result<()> {
        self.manager.send(envelope)
    }

    /// Send commands to `dst`.
    pub fn send_commands(&mut self, dst: &str, cmds: Vec<Command>) -> Result<()> {
        self.manager.send_commands(dst, cmds)
    }

    /// Send one command to the backend and return its id.
    pub fn call(&mut self, cmd: Command) -> Result<u64> {
        self.manager.call(cmd)
    }

    /// Send a response to `dst`.
    pub fn send_response(&mut self, dst: &str, response: Response) -> Result<()> {
        self.manager.send_response(dst, response)
    }

    /// Answer a request, addressed back to its sender.
    pub fn respond(&mut self, request: &Request, response: Response) -> Result<()> {
        self.manager.send_response(&request.src, response)
    }

    /// Next correlation id.
    pub fn next_id(&self) -> u64 {
        self.manager.next_id()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        self.manager.config()
    }

    /// The underlying connection manager.
    pub fn manager(&self) -> &ConnectionManager<WsConnector, EventQueue> {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClubbyError;
    use std::path::PathBuf;

    #[test]
    fn test_builder_configuration() {
        let builder = Client::builder("ws://h:1", "dev", "psk")
            .max_frame_size(64)
            .backend("//elsewhere")
            .tls(TlsConfig {
                ca_file: Some(PathBuf::from("ca.pem")),
                server_name: None,
            });

        assert_eq!(builder.config.server_address, "ws://h:1");
        assert_eq!(builder.config.max_frame_size, 64);
        assert_eq!(builder.config.backend, "//elsewhere");
        assert!(builder.config.tls.is_some());
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new("ws://h", "d", "k");
        assert_eq!(builder.config, ClientConfig::new("ws://h", "d", "k"));
    }

    #[tokio::test]
    async fn test_tls_config_fails_connect() {
        let mut client = Client::builder("ws://h", "d", "k")
            .tls(TlsConfig::default())
            .start()
            .await
            .unwrap();

        assert_eq!(
            client.next_event().await,
            Some(Event::NetConnect { success: false })
        );
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let mut client = ClientBuilder::new("ws://127.0.0.1:9", "d", "k").build();
        let result = client.call(Command::new("/v1/Hello"));
        assert!(matches!(result, Err(ClubbyError::NotConnected)));
    }
}
