//! # clubby-client
//!
//! Device-side client for the clubby command/response protocol over
//! WebSocket.
//!
//! A device keeps one connection to a broker. Both sides send commands
//! (`cmds`) and answer with responses (`resp`). The device encodes what it
//! sends as MessagePack and receives JSON.
//!
//! ## Architecture
//!
//! - **Connection manager** ([`connection`]): single connection, handshake
//!   state machine, outbound sends
//! - **Outbound** ([`protocol`], [`codec`]): envelopes, MessagePack,
//!   fragmentation into WebSocket frames
//! - **Inbound** ([`inbound`]): flat JSON tokens → request/response events
//! - **Transport** ([`transport`]): the socket seam, with a tokio
//!   WebSocket implementation
//!
//! ## Example
//!
//! ```no_run
//! use clubby_client::{Client, Command, Event};
//!
//! #[tokio::main]
//! async fn main() -> clubby_client::Result<()> {
//!     let mut client = Client::builder("ws://127.0.0.1:8000", "device-1", "psk")
//!         .start()
//!         .await?;
//!
//!     while let Some(event) = client.next_event().await {
//!         match event {
//!             Event::Connected => {
//!                 client.call(Command::new("/v1/Hello"))?;
//!             }
//!             Event::Response(reply) => println!("{} -> {}", reply.id, reply.status),
//!             Event::Disconnected => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod inbound;
pub mod protocol;
pub mod transport;

mod client;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, TlsConfig};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{ClubbyError, Result};
pub use event::{Event, EventQueue, EventSink, Reply, Request};
pub use protocol::{next_id, Command, Envelope, Identity, Response};
