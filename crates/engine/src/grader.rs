// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pick quality analysis against the rating knowledge base.

use async_trait::async_trait;
use mtgc_core::{Alternative, ArenaId, CardRating, Grade, PickQuality};
use thiserror::Error;

/// Where GIHWR numbers come from: the cache in front, the store behind.
#[async_trait]
pub trait RatingSource: Send + Sync {
    async fn rating(&self, set_code: &str, format: &str, arena_id: ArenaId) -> Option<CardRating>;
}

/// Non-fatal analyzer errors; the caller logs and stores the pick
/// without a grade.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GradeError {
    #[error("pack is empty")]
    EmptyPack,

    #[error("picked card {0} is not in the pack")]
    PickNotInPack(ArenaId),
}

/// Ranks an observed pick within its pack.
pub struct PickGrader<S> {
    source: S,
}

impl<S: RatingSource> PickGrader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Grade `picked` against the rest of `pack`.
    ///
    /// Returns `Ok(None)` when no card in the pack has a rating, in which
    /// case the pick is stored ungraded. Cards missing a rating contribute
    /// a GIHWR of zero; ties break by card name ascending so the result
    /// is deterministic.
    pub async fn grade_pick(
        &self,
        set_code: &str,
        format: &str,
        pack: &[ArenaId],
        picked: ArenaId,
    ) -> Result<Option<PickQuality>, GradeError> {
        if pack.is_empty() {
            return Err(GradeError::EmptyPack);
        }
        if !pack.contains(&picked) {
            return Err(GradeError::PickNotInPack(picked));
        }

        let mut rated = 0usize;
        let mut entries: Vec<(ArenaId, String, f64)> = Vec::with_capacity(pack.len());
        for &card_id in pack {
            match self.source.rating(set_code, format, card_id).await {
                Some(rating) => {
                    rated += 1;
                    entries.push((card_id, rating.card_name, rating.gihwr));
                }
                None => entries.push((card_id, format!("#{card_id}"), 0.0)),
            }
        }
        if rated == 0 {
            return Ok(None);
        }

        entries.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        let rank = entries
            .iter()
            .position(|(id, _, _)| *id == picked)
            .map(|i| i + 1)
            .unwrap_or(entries.len());
        let picked_card_gihwr = entries
            .iter()
            .find(|(id, _, _)| *id == picked)
            .map(|(_, _, g)| *g)
            .unwrap_or(0.0);

        let alternatives: Vec<Alternative> = entries
            .iter()
            .enumerate()
            .filter(|(_, (id, _, _))| *id != picked)
            .take(5)
            .map(|(i, (id, name, gihwr))| Alternative {
                card_id: *id,
                card_name: name.clone(),
                gihwr: *gihwr,
                rank: i + 1,
            })
            .collect();

        Ok(Some(PickQuality {
            grade: Grade::for_rank(rank),
            rank,
            pack_best_gihwr: entries.first().map(|(_, _, g)| *g).unwrap_or(0.0),
            picked_card_gihwr,
            alternatives,
        }))
    }
}

#[cfg(test)]
#[path = "grader_tests.rs"]
mod tests;
