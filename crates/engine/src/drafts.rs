// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draft session tracking.
//!
//! At most one draft session is active at a time. A pack observation whose
//! signature does not match the active session finalizes it implicitly and
//! starts a new one; an idle session past the horizon is marked stale but
//! preserved.

use crate::delta::Delta;
use chrono::{DateTime, Utc};
use mtgc_core::{
    ArenaId, Clock, DraftSession, DraftSessionId, DraftStatus, Frame, FrameKind, Grade, IdGen,
    PackRow, PickQuality, PickRow, SessionSignature,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// A `DraftPack` event, reduced to the fields the tracker reads.
#[derive(Debug, Clone, PartialEq)]
pub struct PackObserved {
    pub set_code: String,
    pub draft_type: String,
    pub event_name: String,
    pub pack_number: u32,
    pub pick_number: u32,
    pub card_ids: Vec<ArenaId>,
}

/// A `DraftMakePick` event, reduced to the fields the tracker reads.
#[derive(Debug, Clone, PartialEq)]
pub struct PickMade {
    pub pack_number: u32,
    pub pick_number: u32,
    pub card_id: ArenaId,
}

/// A persisted session considered for adoption at startup, paired with
/// its furthest observed `(pack, pick)` progress.
#[derive(Debug, Clone)]
pub struct SessionCandidate {
    pub session: DraftSession,
    pub progress: (u32, u32),
}

/// Pick the session a signature reconciles to.
///
/// Tie-break when several match: the lower `(pack, pick)` progress wins;
/// if equal, the earlier start time.
pub fn select_session_for_signature(
    candidates: Vec<SessionCandidate>,
    signature: &SessionSignature,
) -> Option<DraftSession> {
    candidates
        .into_iter()
        .filter(|c| signature.matches(&c.session))
        .min_by(|a, b| {
            a.progress
                .cmp(&b.progress)
                .then(a.session.start_time.cmp(&b.session.start_time))
        })
        .map(|c| c.session)
}

struct ActiveDraft {
    session: DraftSession,
    packs: BTreeMap<(u32, u32), PackRow>,
    last_activity: DateTime<Utc>,
    score_sum: f64,
    gihwr_sum: f64,
    graded: u32,
}

/// Draft half of the session state machine.
pub struct DraftTracker<C: Clock, G: IdGen> {
    clock: C,
    ids: G,
    stale_after: Duration,
    active: Option<ActiveDraft>,
}

impl<C: Clock, G: IdGen> DraftTracker<C, G> {
    pub fn new(clock: C, ids: G, stale_after: Duration) -> Self {
        Self {
            clock,
            ids,
            stale_after,
            active: None,
        }
    }

    pub fn active_session(&self) -> Option<&DraftSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Cards offered at a position of the active session.
    pub fn pack_cards(&self, pack_number: u32, pick_number: u32) -> Option<&[ArenaId]> {
        self.active
            .as_ref()
            .and_then(|a| a.packs.get(&(pack_number, pick_number)))
            .map(|p| p.card_ids.as_slice())
    }

    /// Resume a recovered session (e.g. daemon restart mid-draft).
    pub fn adopt(&mut self, session: DraftSession, packs: Vec<PackRow>) {
        let now = self.clock.now();
        self.active = Some(ActiveDraft {
            packs: packs
                .into_iter()
                .map(|p| ((p.pack_number, p.pick_number), p))
                .collect(),
            session,
            last_activity: now,
            score_sum: 0.0,
            gihwr_sum: 0.0,
            graded: 0,
        });
    }

    /// `PackObserved`: upsert into the matching session, or roll over.
    pub fn observe_pack(&mut self, obs: PackObserved) -> Vec<Delta> {
        let now = self.clock.now();
        let signature =
            SessionSignature::new(&obs.set_code, &obs.draft_type, &obs.event_name, now);

        let mut deltas = Vec::new();
        let rollover = match &self.active {
            Some(active) => !signature.matches(&active.session),
            None => true,
        };
        if rollover {
            deltas.extend(self.finalize_implicit());
            deltas.extend(self.start_session(&obs, now));
        }

        let Some(active) = self.active.as_mut() else {
            return deltas;
        };
        let pack = PackRow {
            session_id: active.session.session_id.clone(),
            pack_number: obs.pack_number,
            pick_number: obs.pick_number,
            card_ids: obs.card_ids,
        };
        active
            .packs
            .insert((pack.pack_number, pack.pick_number), pack.clone());
        active.last_activity = now;

        deltas.push(Delta::UpsertPack(pack.clone()));
        if !rollover {
            deltas.push(Delta::Broadcast(Frame::new(
                FrameKind::DraftUpdated,
                json!({
                    "session_id": pack.session_id.as_str(),
                    "pack_number": pack.pack_number,
                    "pick_number": pack.pick_number,
                    "cards_in_pack": pack.card_ids.len(),
                }),
                now,
            )));
        }
        deltas
    }

    /// `PickMade`, with the analyzer's verdict when one was available.
    pub fn record_pick(&mut self, pick: PickMade, quality: Option<PickQuality>) -> Vec<Delta> {
        let now = self.clock.now();
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(
                pack = pick.pack_number,
                pick = pick.pick_number,
                "pick observed with no active draft session"
            );
            return Vec::new();
        };
        active.last_activity = now;

        if let Some(q) = &quality {
            active.score_sum += q.grade.score();
            active.gihwr_sum += q.picked_card_gihwr;
            active.graded += 1;
        }

        let row = PickRow {
            session_id: active.session.session_id.clone(),
            pack_number: pick.pack_number,
            pick_number: pick.pick_number,
            card_id: pick.card_id,
            timestamp: now,
            grade: quality.as_ref().map(|q| q.grade),
            alternatives: quality
                .as_ref()
                .map(|q| serde_json::to_value(&q.alternatives).unwrap_or_default()),
        };

        let mut data = json!({
            "session_id": row.session_id.as_str(),
            "pack_number": row.pack_number,
            "pick_number": row.pick_number,
            "card_id": row.card_id,
        });
        if let (Some(obj), Some(q)) = (data.as_object_mut(), &quality) {
            obj.insert("grade".into(), json!(q.grade));
            obj.insert("rank".into(), json!(q.rank));
            obj.insert("pack_best_gihwr".into(), json!(q.pack_best_gihwr));
            obj.insert("picked_card_gihwr".into(), json!(q.picked_card_gihwr));
            obj.insert("alternatives".into(), json!(q.alternatives));
        }

        vec![
            Delta::UpsertPick(row),
            Delta::Broadcast(Frame::new(FrameKind::DraftPick, data, now)),
        ]
    }

    /// `SessionTerminal`: finalize with the event's record.
    pub fn complete(&mut self, wins: Option<u32>, losses: Option<u32>) -> Vec<Delta> {
        let now = self.clock.now();
        let Some(mut active) = self.active.take() else {
            return Vec::new();
        };

        active.session.status = DraftStatus::Completed;
        active.session.end_time = Some(now);
        active.session.wins = wins;
        active.session.losses = losses;
        apply_summary(&mut active);

        let session = active.session;
        let data = json!({
            "session_id": session.session_id.as_str(),
            "wins": session.wins,
            "losses": session.losses,
            "overall_grade": session.overall_grade,
            "overall_score": session.overall_score,
            "predicted_win_rate": session.predicted_win_rate,
        });
        vec![
            Delta::UpsertSession(session),
            Delta::Broadcast(Frame::new(FrameKind::DraftCompleted, data, now)),
        ]
    }

    /// Idle-horizon check, driven by the coordinator's timer tick.
    pub fn check_stale(&mut self) -> Vec<Delta> {
        let now = self.clock.now();
        let expired = self
            .active
            .as_ref()
            .map(|a| (now - a.last_activity).to_std().unwrap_or_default() > self.stale_after)
            .unwrap_or(false);
        if !expired {
            return Vec::new();
        }

        // Checked above; take() cannot return None here.
        let Some(mut active) = self.active.take() else {
            return Vec::new();
        };
        active.session.status = DraftStatus::Stale;
        active.session.end_time = Some(now);
        apply_summary(&mut active);

        let session = active.session;
        tracing::info!(session_id = %session.session_id, "draft session marked stale");
        let data = json!({ "session_id": session.session_id.as_str() });
        vec![
            Delta::UpsertSession(session),
            Delta::Broadcast(Frame::new(FrameKind::DraftStale, data, now)),
        ]
    }

    fn start_session(&mut self, obs: &PackObserved, now: DateTime<Utc>) -> Vec<Delta> {
        let session = DraftSession {
            session_id: DraftSessionId::new(format!("draft-{}", self.ids.next())),
            set_code: obs.set_code.clone(),
            draft_type: obs.draft_type.clone(),
            event_name: obs.event_name.clone(),
            start_time: now,
            end_time: None,
            status: DraftStatus::Active,
            overall_grade: None,
            overall_score: None,
            predicted_win_rate: None,
            wins: None,
            losses: None,
        };
        tracing::info!(
            session_id = %session.session_id,
            set = %session.set_code,
            event = %session.event_name,
            "draft session started"
        );

        self.active = Some(ActiveDraft {
            session: session.clone(),
            packs: BTreeMap::new(),
            last_activity: now,
            score_sum: 0.0,
            gihwr_sum: 0.0,
            graded: 0,
        });

        let data = json!({
            "session_id": session.session_id.as_str(),
            "set_code": session.set_code,
            "draft_type": session.draft_type,
            "event_name": session.event_name,
        });
        vec![
            Delta::UpsertSession(session),
            Delta::Broadcast(Frame::new(FrameKind::DraftStarted, data, now)),
        ]
    }

    /// A new signature supersedes the active session without a terminal
    /// event.
    fn finalize_implicit(&mut self) -> Vec<Delta> {
        let Some(mut active) = self.active.take() else {
            return Vec::new();
        };
        active.session.status = DraftStatus::CompletedImplicit;
        active.session.end_time = Some(self.clock.now());
        apply_summary(&mut active);

        tracing::info!(
            session_id = %active.session.session_id,
            "draft session finalized implicitly"
        );
        vec![Delta::UpsertSession(active.session)]
    }
}

/// Fold the per-pick grading sums into the session summary columns.
fn apply_summary(active: &mut ActiveDraft) {
    if active.graded == 0 {
        return;
    }
    let score = active.score_sum / f64::from(active.graded);
    active.session.overall_score = Some(score);
    active.session.overall_grade = Some(Grade::from_score(score));
    active.session.predicted_win_rate = Some(active.gihwr_sum / f64::from(active.graded));
}

#[cfg(test)]
#[path = "drafts_tests.rs"]
mod tests;
