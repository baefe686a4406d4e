//! Unit tests for the persisted session mirror.

use std::fs;

use crate::session::DEFAULT_ROLE;
use crate::tests::support::temp_mirror;

#[test]
fn save_load_round_trip() {
    let mirror = temp_mirror();

    assert!(mirror.load().is_none());

    mirror.save("tok-1", DEFAULT_ROLE).unwrap();
    let entry = mirror.load().expect("mirror readable after save");
    assert_eq!(entry.token, "tok-1");
    assert_eq!(entry.role, DEFAULT_ROLE);

    mirror.clear();
    assert!(mirror.load().is_none());
}

#[test]
fn both_keys_are_replaced_together() {
    let mirror = temp_mirror();
    mirror.save("tok-1", "admin").unwrap();
    mirror.save("tok-2", DEFAULT_ROLE).unwrap();

    let entry = mirror.load().unwrap();
    assert_eq!(entry.token, "tok-2");
    assert_eq!(entry.role, DEFAULT_ROLE);
    mirror.clear();
}

#[test]
fn corrupt_mirror_is_ignored() {
    let path = std::env::temp_dir().join(format!(
        "factoria-session-test-{}.json",
        uuid::Uuid::new_v4()
    ));
    fs::write(&path, "{not json").unwrap();

    let mirror = crate::auth::SessionMirror::new(&path);
    assert!(mirror.load().is_none());

    fs::remove_file(&path).ok();
}

#[test]
fn clear_tolerates_missing_file() {
    let mirror = temp_mirror();
    // Never saved; clearing must not fail.
    mirror.clear();
    mirror.clear();
}
