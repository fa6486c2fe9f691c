//! Splitting serialized envelopes into WebSocket frames.
//!
//! The fragmentation state lives on the connection, not on the message:
//! only one logical message may be mid-transmission at a time. A message
//! is emitted as
//!
//! ```text
//! Binary(fin=0) Continuation(fin=0) ... Continuation(fin=1)
//! ```
//!
//! or as a single `Binary(fin=1)` frame when it fits.

use bytes::Bytes;

use super::frame::OutboundFrame;
use super::wire_format::OpCode;
use crate::error::{ClubbyError, Result};
use crate::transport::Link;

/// Per-connection fragmentation state.
#[derive(Debug, Default)]
pub struct Fragmenter {
    /// A non-final frame was sent and the closing one has not.
    open: bool,
}

impl Fragmenter {
    /// Create a fragmenter with no message in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fragmented message is currently open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Forget any half-sent message (the link it belonged to is gone).
    pub fn reset(&mut self) {
        self.open = false;
    }

    /// Emit one chunk of the current message.
    ///
    /// The opcode depends only on the connection state: `Binary` when no
    /// message is open, `Continuation` otherwise. The state changes only
    /// once the link accepted the frame. A rejected frame abandons the
    /// message, so the next one starts with `Binary` again.
    pub fn emit<L: Link + ?Sized>(&mut self, link: &mut L, chunk: Bytes, end: bool) -> Result<()> {
        let opcode = if self.open {
            OpCode::Continuation
        } else {
            OpCode::Binary
        };

        tracing::debug!(
            "sending websocket frame flags={:#04x} len={}",
            opcode.header_byte(end),
            chunk.len()
        );

        match link.send_frame(OutboundFrame::new(opcode, end, chunk)) {
            Ok(()) => {
                self.open = !end;
                Ok(())
            }
            Err(e) => {
                if self.open {
                    tracing::warn!("abandoning fragmented message: {}", e);
                }
                self.open = false;
                Err(e)
            }
        }
    }

    /// Send a whole message, split at the given offsets.
    ///
    /// `boundaries` are strictly increasing offsets inside the payload;
    /// `k` boundaries produce `k + 1` frames, the last one final. An empty
    /// slice sends the payload as a single frame.
    ///
    /// # Errors
    ///
    /// - [`ClubbyError::FragmentationInProgress`] if another message is open
    /// - [`ClubbyError::InvalidChunkBoundary`] for out-of-order or
    ///   out-of-range offsets (nothing is sent in that case)
    /// - any error returned by the link
    pub fn fragment_and_send<L: Link + ?Sized>(
        &mut self,
        link: &mut L,
        payload: Bytes,
        boundaries: &[usize],
    ) -> Result<()> {
        if self.open {
            return Err(ClubbyError::FragmentationInProgress);
        }
        validate_boundaries(payload.len(), boundaries)?;

        let mut start = 0;
        for &end in boundaries {
            self.emit(link, payload.slice(start..end), false)?;
            start = end;
        }
        self.emit(link, payload.slice(start..), true)
    }

    /// Send a whole message in frames of at most `max_frame_size` bytes.
    ///
    /// A `max_frame_size` of 0 disables fragmentation.
    pub fn send_message<L: Link + ?Sized>(
        &mut self,
        link: &mut L,
        payload: Bytes,
        max_frame_size: usize,
    ) -> Result<()> {
        let boundaries = split_offsets(payload.len(), max_frame_size);
        self.fragment_and_send(link, payload, &boundaries)
    }
}

/// Interior split offsets for fixed-size chunking.
///
/// ```
/// use clubby_client::protocol::split_offsets;
///
/// assert_eq!(split_offsets(10, 4), vec![4, 8]);
/// assert_eq!(split_offsets(8, 4), vec![4]);
/// assert!(split_offsets(3, 4).is_empty());
/// ```
pub fn split_offsets(len: usize, max_frame_size: usize) -> Vec<usize> {
    if max_frame_size == 0 {
        return Vec::new();
    }
    (max_frame_size..len).step_by(max_frame_size).collect()
}

fn validate_boundaries(len: usize, boundaries: &[usize]) -> Result<()> {
    let mut prev = 0;
    for &offset in boundaries {
        if offset <= prev || offset >= len {
            return Err(ClubbyError::InvalidChunkBoundary { offset, len });
        }
        prev = offset;
    }
    Ok(())
}
