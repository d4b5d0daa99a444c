/// Unit tests for ServiceKey

use std::collections::{BTreeSet, HashSet};

use wirebox::ServiceKey;

#[test]
fn test_key_from_str_and_string_agree() {
    let a = ServiceKey::from("database_port");
    let b = ServiceKey::from(String::from("database_port"));
    let c = ServiceKey::new("database_port");
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.as_str(), "database_port");
}

#[test]
fn test_key_compares_with_str() {
    let key = ServiceKey::from("config");
    assert_eq!(key, "config");
    assert!(key == *"config");
    assert_ne!(key, "Config");
}

#[test]
fn test_key_display_and_debug() {
    let key = ServiceKey::from("personRepo");
    assert_eq!(format!("{}", key), "personRepo");
    assert_eq!(format!("{:?}", key), "\"personRepo\"");
}

#[test]
fn test_key_hashing_and_ordering() {
    let set: HashSet<ServiceKey> = ["a", "b", "a"].into_iter().map(ServiceKey::from).collect();
    assert_eq!(set.len(), 2);
    assert!(set.contains("a"));

    let ordered: BTreeSet<ServiceKey> = ["c", "a", "b"].into_iter().map(ServiceKey::from).collect();
    let names: Vec<_> = ordered.iter().map(ServiceKey::as_str).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_empty_key_is_allowed() {
    let key = ServiceKey::from("");
    assert_eq!(key.as_str(), "");
    assert_eq!(key.to_string(), "");
}
