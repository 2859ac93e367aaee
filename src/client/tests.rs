use super::pubsub_client::{Client, ConnectionId};
use bytes::Bytes;
use tokio::sync::mpsc;

fn addr() -> std::net::SocketAddr {
    "127.0.0.1:4000".parse().unwrap()
}

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<Bytes>();
    let client = Client::new(ConnectionId(3), addr(), tx);
    assert_eq!(client.id, ConnectionId(3));
    assert_eq!(client.addr.port(), 4000);
}

#[test]
fn test_client_send_preserves_order() {
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
    let client = Client::new(ConnectionId(1), addr(), tx);

    assert!(client.send(Bytes::from_static(b"one")));
    assert!(client.send(Bytes::from_static(b"two")));

    assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"one"));
    assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"two"));
}

#[test]
fn test_client_send_to_closed_channel() {
    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
    let client = Client::new(ConnectionId(2), addr(), tx);

    // Drop the receiver to close the channel
    drop(rx);

    assert!(!client.send(Bytes::from_static(b"lost")));
}

#[test]
fn test_connection_id_display() {
    assert_eq!(ConnectionId(42).to_string(), "#42");
}
