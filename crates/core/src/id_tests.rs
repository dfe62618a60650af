// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

// --- define_id! macro tests ---

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn define_id_generates_prefixed_ids() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), 23);
}

#[test]
fn define_id_generates_unique_ids() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn define_id_from_string_round_trips() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.as_str(), "tst-abc");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    let id = TestId::from_string("tst-k");
    map.insert(id, 42);
    assert_eq!(map.get("tst-k"), Some(&42));
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::from_string("tst-abcdef");
    assert_eq!(id.suffix(), "abcdef");
}

#[test]
fn define_id_short_truncates_suffix() {
    let id = TestId::from_string("tst-abcdefghijklmnop");
    assert_eq!(id.short(8), "abcdefgh");
}

#[test]
fn define_id_short_returns_full_when_shorter() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.short(8), "abc");
}

#[test]
fn define_id_display_matches_as_str() {
    let id = TestId::from_string("tst-xyz");
    assert_eq!(id.to_string(), "tst-xyz");
}

#[test]
fn define_id_is_empty() {
    assert!(TestId::from_string("").is_empty());
    assert!(!TestId::new().is_empty());
}

// --- short() free function tests ---

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

// --- IdBuf tests ---

#[test]
fn id_buf_borrows_as_str_for_map_lookup() {
    let buf = IdBuf::new("hello");
    assert_eq!(buf.as_str(), "hello");
}

#[test]
fn id_buf_empty_is_empty() {
    assert!(IdBuf::empty().is_empty());
}

#[test]
fn id_buf_round_trips_through_json() {
    let buf = IdBuf::new("roundtrip");
    let json = serde_json::to_string(&buf).unwrap();
    let back: IdBuf = serde_json::from_str(&json).unwrap();
    assert_eq!(buf, back);
}
