//! Decoding inbound frames into request and response events.
//!
//! A frame is a JSON object that may carry a `resp` array, a `cmds` array,
//! both or neither. Each array is walked element by element and one event
//! is raised per valid element, in array order.
//!
//! The walk over an array stops at the first invalid element: once an
//! element does not look like the protocol says it should, the peer and the
//! device disagree about framing and nothing after it can be trusted. The
//! two arrays are independent; a bad `cmds` element never suppresses
//! responses from the same frame, and vice versa.

use bytes::Bytes;

use super::cursor::TokenCursor;
use super::token::{tokenize, TokenKind};
use crate::error::{ClubbyError, Result};
use crate::event::{Event, EventSink, Reply, Request};

/// Handle one raw inbound frame.
///
/// Always raises [`Event::Frame`] first. Decode failures are logged and
/// swallowed so that a bad frame never takes the connection down.
pub fn on_raw_frame<S: EventSink + ?Sized>(frame: Bytes, sink: &mut S) {
    tracing::debug!(
        "GOT FRAME ({}): {}",
        frame.len(),
        String::from_utf8_lossy(&frame)
    );
    sink.on_event(Event::Frame(frame.clone()));

    if let Err(e) = decode_frame(&frame, sink) {
        tracing::debug!("Error parsing clubby frame: {}", e);
    }
}

fn decode_frame<S: EventSink + ?Sized>(frame: &Bytes, sink: &mut S) -> Result<()> {
    let tokens = tokenize(frame)?;
    let cursor = TokenCursor::new(frame, &tokens);

    if cursor.token(0).map(|t| t.kind) != Some(TokenKind::Object) {
        return Err(ClubbyError::MalformedFrame(
            "top level is not an object".to_string(),
        ));
    }

    if let Some(resp) = cursor.find_field(0, "resp") {
        if let Err(e) = parse_responses(&cursor, frame, resp, sink) {
            tracing::error!("{}", e);
        }
    }

    if let Some(cmds) = cursor.find_field(0, "cmds") {
        if let Err(e) = parse_requests(&cursor, frame, cmds, sink) {
            tracing::error!("{}", e);
        }
    }

    Ok(())
}

fn is_non_empty_array(cursor: &TokenCursor<'_>, index: usize) -> bool {
    cursor
        .token(index)
        .is_some_and(|t| t.kind == TokenKind::Array && t.descendants > 0)
}

fn element_text(cursor: &TokenCursor<'_>, index: usize) -> String {
    cursor
        .token(index)
        .map(|t| String::from_utf8_lossy(t.raw(cursor.src())).into_owned())
        .unwrap_or_default()
}

fn slice_of(frame: &Bytes, cursor: &TokenCursor<'_>, index: usize) -> Bytes {
    match cursor.token(index) {
        Some(t) => frame.slice(t.offset..t.end()),
        None => Bytes::new(),
    }
}

fn parse_responses<S: EventSink + ?Sized>(
    cursor: &TokenCursor<'_>,
    frame: &Bytes,
    array: usize,
    sink: &mut S,
) -> Result<()> {
    if !is_non_empty_array(cursor, array) {
        return Err(ClubbyError::MalformedElement("No resp in resp".to_string()));
    }

    for element in cursor.elements(array) {
        let reply = read_reply(cursor, frame, element)?;
        sink.on_event(Event::Response(reply));
    }
    Ok(())
}

fn read_reply(cursor: &TokenCursor<'_>, frame: &Bytes, element: usize) -> Result<Reply> {
    let src = cursor.src();
    let token = cursor.token(element).copied();
    if token.map(|t| t.kind) != Some(TokenKind::Object) {
        return Err(ClubbyError::MalformedElement(format!(
            "Response array contains non-object: |{}|",
            element_text(cursor, element)
        )));
    }

    let id = cursor
        .find_field(element, "id")
        .and_then(|i| cursor.token(i))
        .and_then(|t| t.u64_value(src))
        .ok_or_else(|| {
            ClubbyError::MalformedElement(format!(
                "No id in response |{}|",
                element_text(cursor, element)
            ))
        })?;

    let status = cursor
        .find_field(element, "status")
        .and_then(|i| cursor.token(i))
        .and_then(|t| t.i64_value(src))
        .ok_or_else(|| {
            ClubbyError::MalformedElement(format!(
                "No status in response |{}|",
                element_text(cursor, element)
            ))
        })?;

    let status_msg = cursor
        .find_field(element, "status_msg")
        .and_then(|i| cursor.token(i))
        .and_then(|t| t.string_value(src));

    let resp = cursor
        .find_field(element, "resp")
        .map(|i| slice_of(frame, cursor, i));

    Ok(Reply {
        id,
        status,
        status_msg,
        resp,
        body: slice_of(frame, cursor, element),
    })
}

fn parse_requests<S: EventSink + ?Sized>(
    cursor: &TokenCursor<'_>,
    frame: &Bytes,
    array: usize,
    sink: &mut S,
) -> Result<()> {
    if !is_non_empty_array(cursor, array) {
        return Err(ClubbyError::MalformedElement("No cmd in cmds".to_string()));
    }

    let src = cursor
        .find_field(0, "src")
        .and_then(|i| cursor.token(i))
        .and_then(|t| t.string_value(cursor.src()))
        .ok_or_else(|| {
            ClubbyError::MalformedElement(format!(
                "Invalid src |{}|",
                element_text(cursor, 0)
            ))
        })?;

    for element in cursor.elements(array) {
        let request = read_request(cursor, frame, element, &src)?;
        sink.on_event(Event::Request(request));
    }
    Ok(())
}

fn read_request(
    cursor: &TokenCursor<'_>,
    frame: &Bytes,
    element: usize,
    src: &str,
) -> Result<Request> {
    let text = cursor.src();
    if cursor.token(element).map(|t| t.kind) != Some(TokenKind::Object) {
        return Err(ClubbyError::MalformedElement(format!(
            "Commands array contains non-object: |{}|",
            element_text(cursor, element)
        )));
    }

    let cmd = cursor
        .find_field(element, "cmd")
        .and_then(|i| cursor.token(i))
        .and_then(|t| t.string_value(text))
        .ok_or_else(|| {
            ClubbyError::MalformedElement(format!(
                "Invalid command |{}|",
                element_text(cursor, element)
            ))
        })?;

    let id = cursor
        .find_field(element, "id")
        .and_then(|i| cursor.token(i))
        .and_then(|t| t.u64_value(text))
        .ok_or_else(|| {
            ClubbyError::MalformedElement(format!(
                "No id in command |{}|",
                element_text(cursor, element)
            ))
        })?;

    Ok(Request {
        src: src.to_string(),
        id,
        cmd,
        body: slice_of(frame, cursor, element),
    })
}
