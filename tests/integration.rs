//! Integration tests for clubby-client.
//!
//! The manager is driven by hand through the in-memory transport, except
//! for the last test which talks to a real WebSocket server on localhost.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request as WsRequest, Response as WsResponse};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use clubby_client::codec::MsgPackCodec;
use clubby_client::inbound::on_raw_frame;
use clubby_client::protocol::{split_offsets, Fragmenter, IdGenerator, OpCode};
use clubby_client::transport::memory::{MemoryConnector, RecordingLink};
use clubby_client::transport::{ConnectionId, TransportEvent, TransportEventKind};
use clubby_client::{
    Client, ClientConfig, ClubbyError, Command, ConnectionManager, Envelope, Event, EventQueue,
    Response,
};

type Manager = ConnectionManager<MemoryConnector, EventQueue>;

fn manager() -> (Manager, MemoryConnector) {
    let connector = MemoryConnector::new();
    let config = ClientConfig::new("ws://broker.test:80", "device-1", "psk");
    let manager = ConnectionManager::new(connector.clone(), config, EventQueue::new());
    (manager, connector)
}

fn feed(m: &mut Manager, kind: TransportEventKind) {
    let conn = m.connection_id().expect("live connection");
    m.handle_transport_event(TransportEvent::new(conn, kind));
}

fn decode_frame(text: &str) -> Vec<Event> {
    let mut queue = EventQueue::new();
    on_raw_frame(Bytes::copy_from_slice(text.as_bytes()), &mut queue);
    queue.drain()
}

/// A second connect never replaces the live connection.
#[test]
fn test_single_connection_invariant() {
    let (mut m, connector) = manager();

    m.connect().unwrap();
    let first = m.connection_id();
    for _ in 0..3 {
        assert!(matches!(m.connect(), Err(ClubbyError::AlreadyConnected)));
    }
    assert_eq!(m.connection_id(), first);

    feed(&mut m, TransportEventKind::Connect { success: true });
    feed(&mut m, TransportEventKind::HandshakeDone);
    assert!(matches!(m.connect(), Err(ClubbyError::AlreadyConnected)));
    assert!(m.is_connected());

    assert_eq!(connector.connects().len(), 1);
}

/// Frames concatenate back to the payload; the flag is open after every
/// non-final chunk and closed after the final one.
#[test]
fn test_fragmentation_round_trip() {
    let payload = Bytes::from((0..1000u32).map(|i| (i * 7 % 256) as u8).collect::<Vec<u8>>());

    for boundaries in [vec![], vec![1], vec![10, 20, 30], split_offsets(1000, 64)] {
        let mut link = RecordingLink::default();
        let mut fragmenter = Fragmenter::new();

        let mut start = 0;
        let mut chunks: Vec<(Bytes, bool)> = boundaries
            .iter()
            .map(|&end| {
                let chunk = payload.slice(start..end);
                start = end;
                (chunk, false)
            })
            .collect();
        chunks.push((payload.slice(start..), true));

        for (chunk, end) in chunks {
            fragmenter.emit(&mut link, chunk, end).unwrap();
            assert_eq!(fragmenter.is_open(), !end);
        }

        let joined: Vec<u8> = link.frames.iter().flat_map(|f| f.payload().to_vec()).collect();
        assert_eq!(joined, payload.to_vec());
        assert_eq!(link.frames.len(), boundaries.len() + 1);
        assert_eq!(link.frames[0].opcode, OpCode::Binary);
        assert!(link.frames[1..].iter().all(|f| f.opcode == OpCode::Continuation));
    }
}

#[test]
fn test_id_monotonicity() {
    let ids = IdGenerator::new();
    let mut last = 0;
    for expected in 1..=100 {
        let id = ids.next_id();
        assert_eq!(id, expected);
        assert!(id > last);
        last = id;
    }

    let a = clubby_client::next_id();
    let b = clubby_client::next_id();
    assert!(b > a && a >= 1);
}

#[test]
fn test_decoder_fail_stop() {
    let events = decode_frame(r#"{"resp":[{"id":1,"status":0},{"id":2}]}"#);

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::Frame(_)));
    assert!(matches!(&events[1], Event::Response(r) if r.id == 1 && r.status == 0));
}

#[test]
fn test_independent_arrays() {
    let events = decode_frame(
        r#"{"src":"//api","resp":[{"id":1,"status":0},{"id":2,"status":5}],
            "cmds":[{"id":"x","cmd":"/v1/A"},{"id":3,"cmd":"/v1/B"}]}"#,
    );

    let replies: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Response(r) => Some(r.id),
            _ => None,
        })
        .collect();
    let requests = events.iter().filter(|e| matches!(e, Event::Request(_))).count();

    assert_eq!(replies, vec![1, 2]);
    assert_eq!(requests, 0);
}

#[test]
fn test_end_to_end_lifecycle() {
    let (mut m, connector) = manager();

    m.connect().unwrap();
    feed(&mut m, TransportEventKind::Connect { success: true });
    feed(&mut m, TransportEventKind::HandshakeDone);

    assert!(m.is_connected());
    let events = m.sink_mut().drain();
    assert_eq!(
        events,
        vec![Event::NetConnect { success: true }, Event::Connected]
    );
    assert_eq!(connector.handshakes().len(), 1);

    feed(&mut m, TransportEventKind::Closed);
    assert!(!m.is_connected());
    assert_eq!(m.sink_mut().drain(), vec![Event::Disconnected]);
}

#[test]
fn test_malformed_json_frame() {
    for garbage in ["", "{", "\u{1}\u{2}", "{\"resp\":[{\"id\":1,\"status\":0}]", "[1,2"] {
        let events = decode_frame(garbage);
        assert_eq!(events.len(), 1, "input {:?}", garbage);
        assert!(matches!(events[0], Event::Frame(_)));
    }
}

#[test]
fn test_request_then_response_through_manager() {
    let (mut m, connector) = manager();
    m.connect().unwrap();
    feed(&mut m, TransportEventKind::Connect { success: true });
    feed(&mut m, TransportEventKind::HandshakeDone);
    m.sink_mut().drain();

    feed(
        &mut m,
        TransportEventKind::Frame(Bytes::from_static(
            r#"{"src":"//api","dst":"device-1","cmds":[{"id":42,"cmd":"/v1/Get","args":{"key":"té"}}]}"#.as_bytes(),
        )),
    );

    let request = match m.sink_mut().drain().pop() {
        Some(Event::Request(request)) => request,
        other => panic!("expected a request, got {:?}", other),
    };
    assert_eq!(request.cmd, "/v1/Get");
    let args: Option<serde_json::Value> = request.args().unwrap();
    assert_eq!(args, Some(json!({ "key": "té" })));

    m.send_response(&request.src, Response::ok(request.id).with_resp(json!(17)))
        .unwrap();

    let frames = connector.frames();
    assert_eq!(frames.len(), 1);
    let envelope: Envelope = MsgPackCodec::decode(frames[0].payload()).unwrap();
    assert_eq!(envelope.src(), "device-1");
    assert_eq!(envelope.dst(), "//api");
    assert_eq!(envelope.key(), "psk");
    let resp = envelope.resp().unwrap();
    assert_eq!(resp[0].id, 42);
    assert_eq!(resp[0].resp, Some(json!(17)));
}

#[test]
fn test_reconnect_after_close() {
    let (mut m, connector) = manager();
    m.connect().unwrap();
    let old = m.connection_id().unwrap();
    feed(&mut m, TransportEventKind::Connect { success: true });
    feed(&mut m, TransportEventKind::Closed);

    // Closing before the handshake still ends the connection exactly once
    assert_eq!(
        m.sink_mut().drain(),
        vec![Event::NetConnect { success: true }, Event::Disconnected]
    );

    m.connect().unwrap();
    let new = m.connection_id().unwrap();
    assert_ne!(old, new);

    m.handle_transport_event(TransportEvent::new(old, TransportEventKind::HandshakeDone));
    m.handle_transport_event(TransportEvent::new(old, TransportEventKind::Closed));
    assert!(!m.is_connected());
    assert!(m.sink().is_empty());

    feed(&mut m, TransportEventKind::Connect { success: true });
    feed(&mut m, TransportEventKind::HandshakeDone);
    assert!(m.is_connected());
    assert_eq!(
        m.sink_mut().drain(),
        vec![Event::NetConnect { success: true }, Event::Connected]
    );
    assert_eq!(connector.connects().len(), 2);
    assert_eq!(ConnectionId(2), new);
}

#[tokio::test]
async fn test_client_against_local_broker() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |_req: &WsRequest, mut response: WsResponse| -> Result<WsResponse, ErrorResponse> {
            response.headers_mut().insert(
                "sec-websocket-protocol",
                HeaderValue::from_static("clubby.cesanta.com"),
            );
            Ok(response)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

        let command = r#"{"src":"//api","dst":"device-1","cmds":[{"id":5,"cmd":"/v1/Ping"}]}"#;
        ws.send(Message::Text(command.to_string().into())).await.unwrap();

        let answer = loop {
            match ws.next().await {
                Some(Ok(Message::Binary(data))) => break data,
                Some(Ok(_)) => continue,
                other => panic!("unexpected {:?}", other),
            }
        };
        let envelope: Envelope = MsgPackCodec::decode(&answer).unwrap();
        let _ = ws.close(None).await;
        envelope
    });

    let mut client = Client::builder(format!("ws://{}", addr), "device-1", "psk")
        .max_frame_size(8)
        .start()
        .await
        .unwrap();

    assert_eq!(client.next_event().await, Some(Event::NetConnect { success: true }));
    assert_eq!(client.next_event().await, Some(Event::Connected));
    assert!(client.is_connected());

    assert!(matches!(client.next_event().await, Some(Event::Frame(_))));
    let request = match client.next_event().await {
        Some(Event::Request(request)) => request,
        other => panic!("expected a request, got {:?}", other),
    };
    assert_eq!(request.id, 5);
    assert_eq!(request.src, "//api");

    client
        .respond(&request, Response::ok(request.id).with_resp(json!("pong")))
        .unwrap();

    let envelope = broker.await.unwrap();
    assert_eq!(envelope.dst(), "//api");
    assert_eq!(envelope.resp().unwrap()[0].id, 5);
    assert_eq!(envelope.resp().unwrap()[0].resp, Some(json!("pong")));

    assert_eq!(client.next_event().await, Some(Event::Disconnected));
    assert!(!client.is_connected());
    assert!(matches!(
        client.call(Command::new("/v1/Hello")),
        Err(ClubbyError::NotConnected)
    ));
}
