//! Scan history and local ranking.

use crate::scoring::Vibe;
use crate::types::Mode;
use serde::{Deserialize, Serialize};

/// Maximum number of history entries kept.
pub const HISTORY_LIMIT: usize = 100;

/// One finished scan, as kept for local ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub aura: i64,
    pub vibe: Vibe,
    pub mode: Mode,
}

/// Append `entry`, dropping the oldest entries beyond `limit`.
pub fn append_capped(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    history.push(entry);
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }
}

/// 1-based rank of `aura` among past scans: entries with a strictly
/// higher aura, plus one.
pub fn local_rank(history: &[HistoryEntry], aura: i64) -> usize {
    history.iter().filter(|h| h.aura > aura).count() + 1
}
