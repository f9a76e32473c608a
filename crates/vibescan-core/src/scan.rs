//! Turning a closed window into a finished scan.
//!
//! Scores every face, then records the scan: counters, badges, history.
//! Store failures skip the write they affect and never change the scores.

use crate::badges::{self, evaluate};
use crate::entitlement::{is_premium_or_free, Entitlement};
use crate::history::{self, HistoryEntry};
use crate::quota;
use crate::scoring::{score_detection, BeautyTier, ScoreSet};
use crate::session::ClosedWindow;
use crate::store::{self, KeyValueStore, KEY_BADGES, KEY_DAILY_COUNT, KEY_HISTORY, KEY_SCAN_COUNT};
use crate::types::Mode;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("no face in the closed window could be scored")]
    NoScorableFace,
}

/// Which side won a duo scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// The first face wins only with a strictly higher aura.
pub fn duo_winner(left: &ScoreSet, right: &ScoreSet) -> Side {
    if left.aura > right.aura {
        Side::Left
    } else {
        Side::Right
    }
}

/// Everything the presentation layer needs for one finished scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub mode: Mode,
    /// One entry per scorable face, in slot order.
    pub results: Vec<ScoreSet>,
    /// Badge ids unlocked by this scan.
    pub new_badges: Vec<String>,
    pub history_entry: HistoryEntry,
    /// Rank of the first face's aura among stored history.
    pub local_rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duo_winner: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beauty_tier: Option<BeautyTier>,
}

impl ScanReport {
    pub fn headline(&self) -> &ScoreSet {
        &self.results[0]
    }
}

fn write_or_warn(result: Result<(), store::StoreError>, what: &str) {
    if let Err(e) = result {
        tracing::warn!(error = %e, what, "store write failed; skipping");
    }
}

/// Score a closed window and record the scan.
pub fn complete_scan<S, E, R>(
    window: &ClosedWindow,
    mode: Mode,
    store: &mut S,
    entitlement: &E,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<ScanReport, ScanError>
where
    S: KeyValueStore + ?Sized,
    E: Entitlement + ?Sized,
    R: Rng + ?Sized,
{
    let mut results: Vec<ScoreSet> = Vec::with_capacity(window.averages.len());
    for (slot, (avg, det)) in window.averages.iter().zip(&window.detections).enumerate() {
        match score_detection(avg, det, window.frame, mode, rng) {
            Ok(scores) => results.push(scores),
            Err(e) => tracing::warn!(slot, error = %e, "skipping face"),
        }
    }
    if results.is_empty() {
        return Err(ScanError::NoScorableFace);
    }

    let is_premium = is_premium_or_free(entitlement);
    let unlocked = store::unlocked_badges(&*store);
    let held = badges::labels(&unlocked);
    for r in &mut results {
        r.badges = held.clone();
    }

    let scan_count = store::scan_count(&*store) + 1;
    write_or_warn(store.set(KEY_SCAN_COUNT, json!(scan_count)), KEY_SCAN_COUNT);
    let daily = quota::daily_count(&*store) + 1;
    write_or_warn(store.set(KEY_DAILY_COUNT, json!(daily)), KEY_DAILY_COUNT);

    let evaluation = evaluate(&results[0], scan_count, is_premium, &unlocked, mode, now.timestamp_millis());
    if !evaluation.newly_unlocked.is_empty() {
        tracing::info!(badges = ?evaluation.newly_unlocked, "new badges unlocked");
        let mut all = unlocked;
        all.extend(evaluation.newly_unlocked.iter().cloned());
        write_or_warn(store.set(KEY_BADGES, json!(all)), KEY_BADGES);
    }

    let entry = evaluation.history_entry;
    match serde_json::to_value(&entry) {
        Ok(value) => write_or_warn(store.append(KEY_HISTORY, value, history::HISTORY_LIMIT), KEY_HISTORY),
        Err(e) => tracing::warn!(error = %e, "failed to encode history entry"),
    }
    let local_rank = history::local_rank(&store::history(&*store), entry.aura);

    let duo_winner = match (mode, results.as_slice()) {
        (Mode::Duo, [left, right, ..]) => Some(duo_winner(left, right)),
        _ => None,
    };
    let beauty_tier = results[0].beauty_score.map(BeautyTier::from_score);

    let report = ScanReport {
        scan_id: Uuid::new_v4(),
        mode,
        results,
        new_badges: evaluation.newly_unlocked,
        history_entry: entry,
        local_rank,
        duo_winner,
        beauty_tier,
    };

    tracing::info!(
        scan_id = %report.scan_id,
        mode = %mode,
        faces = report.results.len(),
        aura = report.history_entry.aura,
        vibe = %report.history_entry.vibe,
        rank = report.local_rank,
        "scan complete"
    );

    Ok(report)
}
