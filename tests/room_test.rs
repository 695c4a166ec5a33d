use rusty_relay::core::room::RoomRegistry;
use rusty_relay::error::RelayError;

#[test]
fn test_room_membership_lifecycle() {
    let registry = RoomRegistry::new(10);

    // Rooms come into existence on first join
    assert_eq!(registry.size("standup").unwrap(), 0);
    assert_eq!(registry.join("c1", "standup").unwrap(), 1);
    assert!(registry.is_member("c1", "standup").unwrap());

    // ...and disappear when the last member leaves
    assert_eq!(registry.leave("c1", "standup").unwrap(), Some(0));
    assert_eq!(registry.room_count().unwrap(), 0);
}

#[test]
fn test_room_never_exceeds_capacity() {
    let registry = RoomRegistry::new(3);

    let results: Vec<_> = (0..6)
        .map(|i| registry.join(&format!("c{}", i), "small"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert!(results[3..]
        .iter()
        .all(|r| matches!(r, Err(RelayError::RoomFull { capacity: 3, .. }))));
    assert_eq!(registry.size("small").unwrap(), 3);

    // A freed slot can be taken again
    registry.leave("c0", "small").unwrap();
    assert_eq!(registry.join("c5", "small").unwrap(), 3);
}

#[test]
fn test_broadcast_targets_never_include_caller() {
    let registry = RoomRegistry::new(10);
    for i in 0..5 {
        registry.join(&format!("c{}", i), "r1").unwrap();
    }

    for i in 0..5 {
        let caller = format!("c{}", i);
        let targets = registry.members_except("r1", &caller).unwrap();
        assert_eq!(targets.len(), 4);
        assert!(!targets.contains(&caller));
    }
}

#[test]
fn test_rooms_are_tracked_per_client() {
    let registry = RoomRegistry::new(10);
    registry.join("c1", "a").unwrap();
    registry.join("c1", "b").unwrap();
    registry.join("c2", "b").unwrap();

    let mut rooms = registry.client_rooms("c1").unwrap();
    rooms.sort();
    assert_eq!(rooms, vec!["a".to_string(), "b".to_string()]);

    registry.remove_client("c1").unwrap();
    assert!(registry.client_rooms("c1").unwrap().is_empty());
    assert_eq!(registry.members("b").unwrap(), vec!["c2".to_string()]);
}
