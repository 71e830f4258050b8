// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::draft::DraftSessionId;
use crate::match_record::MatchId;

#[test]
fn match_id_display() {
    let id = MatchId::new("match-abc123");
    assert_eq!(id.to_string(), "match-abc123");
}

#[test]
fn match_id_equality() {
    let id1 = MatchId::new("m-1");
    let id2 = MatchId::new("m-1");
    let id3 = MatchId::new("m-2");

    assert_eq!(id1, id2);
    assert_ne!(id1, id3);
}

#[test]
fn draft_session_id_from_str() {
    let id: DraftSessionId = "draft-1".into();
    assert_eq!(id.as_str(), "draft-1");
}

#[test]
fn match_id_serde() {
    let id = MatchId::new("m-99");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"m-99\"");

    let parsed: MatchId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn uuid_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}
