use super::pubsub_client::{Client, ClientTable};
use crate::auth::{Identity, Role};
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    assert!(client.id.starts_with("conn-"));
    assert!(!client.is_authenticated());
}

#[test]
fn test_client_ids_are_unique() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let a = Client::new(tx.clone());
    let b = Client::new(tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_table_send_and_remove() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut client = Client::new(tx);
    client.identity = Some(Identity::new("u1", Role::Citizen));
    let id = client.id.clone();

    let mut table = ClientTable::new();
    table.register(client);
    assert!(table.get(&id).unwrap().is_authenticated());

    assert!(table.send(&id, WsMessage::text("hello")));
    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("hello"));

    assert!(table.remove(&id).is_some());
    assert!(!table.send(&id, WsMessage::text("gone")));
    assert!(table.is_empty());
}

#[test]
fn test_send_to_closed_channel_is_dropped() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    drop(rx);
    assert!(!client.send(WsMessage::text("hello")));
}
