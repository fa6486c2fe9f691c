//! Inbound module - decoding frames received from the broker.
//!
//! - [`token`] - flat JSON token stream (no tree allocation)
//! - [`cursor`] - field lookup and array walking over that stream
//! - [`on_raw_frame`] - turns a frame into request/response events

pub mod cursor;
pub mod token;

mod dispatch;

pub use cursor::{ArrayElements, TokenCursor};
pub use dispatch::on_raw_frame;
pub use token::{tokenize, Token, TokenKind};
