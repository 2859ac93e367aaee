use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::{Command, render};
use crate::broker::message::Message;
use crate::transport::codec::{ContentCodec, RequestCodec};
use crate::transport::datagram::Datagram;
use crate::transport::message::ClientRequest;
use crate::transport::payload::Value;
use crate::utils::Error;

fn delivery(topic: &str, value: &Value) -> Message {
    let source: SocketAddr = "10.0.0.1:4000".parse().unwrap();
    Message::from_datagram(Datagram::new(topic, value), source).unwrap()
}

#[test]
fn test_parse_commands() {
    assert_eq!(
        Command::parse("subscribe news 1\n").unwrap(),
        Some(Command::Subscribe {
            topic: "news".to_string(),
            flag: 1
        })
    );
    assert_eq!(
        Command::parse("unsubscribe news").unwrap(),
        Some(Command::Unsubscribe {
            topic: "news".to_string()
        })
    );
    assert_eq!(Command::parse("exit").unwrap(), Some(Command::Exit));
}

#[test]
fn test_parse_ignores_incomplete_or_unknown() {
    assert_eq!(Command::parse("").unwrap(), None);
    assert_eq!(Command::parse("   ").unwrap(), None);
    assert_eq!(Command::parse("subscribe news").unwrap(), None);
    assert_eq!(Command::parse("unsubscribe").unwrap(), None);
    assert_eq!(Command::parse("publish news 1").unwrap(), None);
}

#[test]
fn test_parse_reads_flag_like_atoi() {
    let flag = |line: &str| match Command::parse(line).unwrap() {
        Some(Command::Subscribe { flag, .. }) => flag,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(flag("subscribe t 0"), 0);
    assert_eq!(flag("subscribe t 2"), 2);
    assert_eq!(flag("subscribe t 12abc"), 12);
    assert_eq!(flag("subscribe t yes"), 0);
    assert_eq!(flag("subscribe t -3"), -3);
    assert_eq!(flag("subscribe t +1"), 1);
}

#[test]
fn test_flag_is_sent_as_low_byte() {
    let command = Command::Subscribe {
        topic: "t".to_string(),
        flag: 258,
    };
    assert_eq!(
        command.to_request(),
        Some(ClientRequest::Subscribe {
            topic: "t".to_string(),
            store_and_forward: 2
        })
    );
    assert_eq!(Command::Exit.to_request(), None);
}

#[test]
fn test_parse_refuses_long_topic() {
    let line = format!("subscribe {} 0", "x".repeat(51));
    assert!(matches!(Command::parse(&line), Err(Error::Usage(_))));

    let line = format!("unsubscribe {}", "x".repeat(50));
    assert!(Command::parse(&line).unwrap().is_some());
}

#[test]
fn test_render_known_types() {
    let int = Value::Int {
        negative: true,
        magnitude: 42,
    };
    assert_eq!(
        render(&delivery("sensors/temp", &int)).unwrap(),
        "10.0.0.1:4000 - sensors/temp - INT - -42"
    );
    assert_eq!(
        render(&delivery("t", &Value::ShortReal(1234))).unwrap(),
        "10.0.0.1:4000 - t - SHORT_REAL - 12.34"
    );
    let float = Value::Float {
        negative: false,
        magnitude: 1234,
        exponent: 2,
    };
    assert_eq!(
        render(&delivery("t", &float)).unwrap(),
        "10.0.0.1:4000 - t - FLOAT - 12.34"
    );
    assert_eq!(
        render(&delivery("t", &Value::String("hello world".to_string()))).unwrap(),
        "10.0.0.1:4000 - t - STRING - hello world"
    );
}

#[test]
fn test_render_unknown_type() {
    let mut message = delivery("t", &Value::ShortReal(1));
    message.header.data_type = 9;
    message.payload = bytes::Bytes::new();
    message.header.data_len = 0;
    assert_eq!(render(&message).unwrap(), "10.0.0.1:4000 - t - UNKNOWN - ");
}

#[test]
fn test_render_rejects_truncated_payload() {
    let mut message = delivery("t", &Value::ShortReal(1));
    message.header.data_type = 0;
    assert!(render(&message).is_err());
}

#[tokio::test]
async fn test_session_logs_in_and_relays_commands() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut requests = FramedRead::new(read_half, RequestCodec);
        let mut deliveries = FramedWrite::new(write_half, ContentCodec);

        let mut received = Vec::new();
        for _ in 0..3 {
            let frame = requests.next().await.unwrap().unwrap();
            received.push(frame.decode().unwrap());
        }

        let message = delivery("news", &Value::ShortReal(250));
        deliveries.send(&message).await.unwrap();
        received
    });

    let (mut control, control_rx) = tokio::io::duplex(256);
    let session = tokio::spawn(async move {
        super::run(addr, "alice", true, tokio::io::BufReader::new(control_rx)).await
    });

    control
        .write_all(b"subscribe news 1\nbogus\nsubscribe news\nunsubscribe news\n")
        .await
        .unwrap();

    let received = broker.await.unwrap();
    assert_eq!(
        received,
        vec![
            ClientRequest::Login {
                identity: "alice".to_string()
            },
            ClientRequest::Subscribe {
                topic: "news".to_string(),
                store_and_forward: 1
            },
            ClientRequest::Unsubscribe {
                topic: "news".to_string()
            },
        ]
    );

    // The broker task dropped its socket, which ends the session.
    let result = tokio::time::timeout(Duration::from_secs(2), session)
        .await
        .expect("session did not end")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_session_stops_on_exit() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut requests = FramedRead::new(stream, RequestCodec);
        let login = requests.next().await.unwrap().unwrap().decode().unwrap();
        // Stays open until the consumer hangs up.
        let rest = requests.next().await;
        (login, rest.is_none())
    });

    let control = tokio::io::BufReader::new(&b"exit\n"[..]);
    tokio::time::timeout(Duration::from_secs(2), super::run(addr, "bob", false, control))
        .await
        .expect("session did not stop")
        .unwrap();

    let (login, closed) = broker.await.unwrap();
    assert_eq!(
        login,
        ClientRequest::Login {
            identity: "bob".to_string()
        }
    );
    assert!(closed);
}

#[tokio::test]
async fn test_session_ignores_non_utf8_control_line() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut requests = FramedRead::new(stream, RequestCodec);
        let mut received = Vec::new();
        for _ in 0..2 {
            let frame = requests.next().await.unwrap().unwrap();
            received.push(frame.decode().unwrap());
        }
        received
    });

    let control = tokio::io::BufReader::new(&b"\xff\xfe garbage\nsubscribe news 0\n"[..]);
    let result = tokio::time::timeout(Duration::from_secs(2), super::run(addr, "erin", true, control))
        .await
        .expect("session did not end");
    assert!(result.is_ok());

    assert_eq!(
        broker.await.unwrap(),
        vec![
            ClientRequest::Login {
                identity: "erin".to_string()
            },
            ClientRequest::Subscribe {
                topic: "news".to_string(),
                store_and_forward: 0
            },
        ]
    );
}

#[tokio::test]
async fn test_connect_applies_tcp_nodelay() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    for nodelay in [true, false] {
        let stream = super::session::connect(addr, nodelay).await.unwrap();
        let _accepted = listener.accept().await.unwrap();
        assert_eq!(stream.nodelay().unwrap(), nodelay);
    }
}
