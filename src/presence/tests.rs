use super::*;
use crate::auth::Role;

#[test]
fn test_first_connection_goes_online() {
    let mut registry = PresenceRegistry::new();
    let first = registry.register_connection("u1", Role::Parent, "c1");
    assert!(first.went_online);
    assert!(registry.is_online("u1"));

    let second = registry.register_connection("u1", Role::Parent, "c2");
    assert!(!second.went_online);
    assert_eq!(registry.connections_of("u1").len(), 2);
}

#[test]
fn test_register_is_idempotent() {
    let mut registry = PresenceRegistry::new();
    registry.register_connection("u1", Role::Parent, "c1");
    let again = registry.register_connection("u1", Role::Parent, "c1");
    assert!(!again.went_online);
    assert_eq!(registry.connections_of("u1").len(), 1);
}

#[test]
fn test_last_connection_goes_offline() {
    let mut registry = PresenceRegistry::new();
    registry.register_connection("u1", Role::Fire, "c1");
    registry.register_connection("u1", Role::Fire, "c2");

    let departure = registry.remove_connection("c1").unwrap();
    assert!(!departure.went_offline);
    assert!(registry.is_online("u1"));

    let departure = registry.remove_connection("c2").unwrap();
    assert!(departure.went_offline);
    assert_eq!(departure.subscriber_id, "u1");
    assert_eq!(departure.role, Role::Fire);
    assert!(!registry.is_online("u1"));
    assert!(registry.connections_of("u1").is_empty());
}

#[test]
fn test_remove_unknown_connection_is_noop() {
    let mut registry = PresenceRegistry::new();
    registry.register_connection("u1", Role::Fire, "c1");
    assert!(registry.remove_connection("nope").is_none());
    assert!(registry.remove_connection("c1").is_some());
    assert!(registry.remove_connection("c1").is_none());
}

#[test]
fn test_subscriber_of() {
    let mut registry = PresenceRegistry::new();
    registry.register_connection("u1", Role::Citizen, "c1");
    let subscriber = registry.subscriber_of("c1").unwrap();
    assert_eq!(subscriber.id, "u1");
    assert_eq!(subscriber.role, Role::Citizen);
    assert!(registry.subscriber_of("c2").is_none());
}

#[test]
fn test_reconnect_refreshes_role() {
    let mut registry = PresenceRegistry::new();
    registry.register_connection("u1", Role::Citizen, "c1");
    registry.register_connection("u1", Role::Police, "c2");
    assert_eq!(registry.subscriber_of("c1").unwrap().role, Role::Police);
}

#[test]
fn test_connection_moves_between_subscribers() {
    let mut registry = PresenceRegistry::new();
    registry.register_connection("u1", Role::Citizen, "c1");
    let moved = registry.register_connection("u2", Role::Police, "c1");

    assert!(moved.went_online);
    assert!(!registry.is_online("u1"));
    assert_eq!(registry.subscriber_of("c1").unwrap().id, "u2");
    assert_eq!(registry.online_count(), 1);
}
