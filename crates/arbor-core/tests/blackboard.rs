use arbor_core::{BbKey, Blackboard};

const AMMO: BbKey<u32> = BbKey::new("ammo");
const TARGET: BbKey<String> = BbKey::new("target");

#[test]
fn typed_keys_share_storage_with_string_keys() {
    let mut bb = Blackboard::new();
    assert!(!bb.contains(AMMO));

    bb.set(AMMO, 30);
    bb.set_value(TARGET.name(), "crate".to_string());

    assert_eq!(bb.get_value("ammo", 0u32), 30);
    assert_eq!(bb.get(TARGET).map(String::as_str), Some("crate"));

    *bb.get_mut(AMMO).unwrap() -= 5;
    assert_eq!(bb.remove(AMMO), Some(25));
    assert!(!bb.has_value("ammo"));
    assert_eq!(bb.keys().collect::<Vec<_>>(), vec!["target"]);
}

#[test]
fn missing_key_returns_default() {
    let bb = Blackboard::new();
    assert_eq!(bb.get_value("health", 100i32), 100);
    assert!(!bb.has_value("health"));
}

#[test]
fn writes_overwrite_unconditionally() {
    let mut bb = Blackboard::new();
    bb.set_value("health", 10i32);
    bb.set_value("health", 20i32);
    assert_eq!(bb.get_value("health", 0i32), 20);

    // A different type replaces the old entry as well.
    bb.set_value("health", "dead");
    assert_eq!(bb.get_value("health", 0i32), 0);
    assert_eq!(bb.get_value("health", ""), "dead");
    assert_eq!(bb.len(), 1);
}

#[test]
fn keys_are_case_sensitive() {
    let mut bb = Blackboard::new();
    bb.set_value("Target", 1u8);
    assert!(bb.has_value("Target"));
    assert!(!bb.has_value("target"));
    assert_eq!(bb.get_value("target", 0u8), 0);
}

#[test]
fn type_mismatch_returns_default_and_keeps_value() {
    let mut bb = Blackboard::new();
    bb.set(BbKey::<u32>::new("n"), 1u32);

    assert_eq!(bb.get(BbKey::<i32>::new("n")), None);
    assert_eq!(bb.get_or(BbKey::<i32>::new("n"), -1), -1);
    assert_eq!(bb.remove(BbKey::<i32>::new("n")), None);
    assert_eq!(bb.get(BbKey::<u32>::new("n")).copied(), Some(1));
}

#[test]
fn remove_value_reports_presence() {
    let mut bb = Blackboard::new();
    bb.set_value("x", 1.5f32);
    assert!(bb.remove_value("x"));
    assert!(!bb.remove_value("x"));
    assert!(bb.is_empty());
}

#[test]
fn revision_tracks_every_write() {
    let mut bb = Blackboard::new();
    assert_eq!(bb.revision("seen"), None);

    bb.set_value("seen", true);
    let first = bb.revision("seen").unwrap();

    bb.set_value("other", 0u8);
    assert_eq!(bb.revision("seen"), Some(first));

    bb.set_value("seen", true);
    let second = bb.revision("seen").unwrap();
    assert!(second > first);

    bb.remove_value("seen");
    assert_eq!(bb.revision("seen"), None);
}

#[test]
fn value_mut_edits_in_place() {
    let mut bb = Blackboard::new();
    bb.set_value("hits", vec![1u32]);
    bb.value_mut::<Vec<u32>>("hits").unwrap().push(2);
    assert_eq!(bb.value::<Vec<u32>>("hits").unwrap(), &vec![1, 2]);
}
