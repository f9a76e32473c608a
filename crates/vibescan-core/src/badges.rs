//! Badge catalog and unlock evaluation.

use crate::history::HistoryEntry;
use crate::scoring::ScoreSet;
use crate::types::Mode;
use serde::Serialize;

/// A badge definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub id: &'static str,
    pub emoji: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Only awarded to premium users.
    pub premium: bool,
}

impl Badge {
    /// Label shown on the result card, e.g. `"🗿 Sigma Master"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji, self.name)
    }
}

pub const SIGMA_MASTER: Badge = Badge {
    id: "sigma_master",
    emoji: "🗿",
    name: "Sigma Master",
    description: "Sigma score > 90",
    premium: false,
};

pub const NPC_HUNTER: Badge = Badge {
    id: "npc_hunter",
    emoji: "💀",
    name: "NPC Hunter",
    description: "Detected a pure NPC",
    premium: false,
};

pub const RIZZ_KING: Badge = Badge {
    id: "rizz_king",
    emoji: "👑",
    name: "Rizz King",
    description: "Rizz > 85 (Premium)",
    premium: true,
};

pub const AURA_LEGEND: Badge = Badge {
    id: "aura_legend",
    emoji: "⚡",
    name: "Aura Legend",
    description: "Aura > 5000 (Premium)",
    premium: true,
};

pub const MAIN_CHARACTER: Badge = Badge {
    id: "main_character",
    emoji: "🔥",
    name: "Main Character",
    description: "50+ Total Scans",
    premium: true,
};

/// All badges, in evaluation order.
pub const CATALOG: [Badge; 5] = [SIGMA_MASTER, NPC_HUNTER, RIZZ_KING, AURA_LEGEND, MAIN_CHARACTER];

pub fn find(id: &str) -> Option<&'static Badge> {
    CATALOG.iter().find(|b| b.id == id)
}

/// Card labels for the given ids. Unknown ids are skipped.
pub fn labels<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter().filter_map(|id| find(id.as_ref())).map(Badge::label).collect()
}

fn is_earned(badge: &Badge, result: &ScoreSet, scan_count: u64) -> bool {
    match badge.id {
        "sigma_master" => result.scores.sigma > 90,
        "npc_hunter" => result.scores.npc > 90,
        "rizz_king" => result.scores.rizz > 85,
        "aura_legend" => result.aura > 5000,
        "main_character" => scan_count >= 50,
        _ => false,
    }
}

/// Outcome of evaluating one finished scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Ids unlocked by this scan, in catalog order.
    pub newly_unlocked: Vec<String>,
    /// Entry to append to the history.
    pub history_entry: HistoryEntry,
}

/// Evaluate badge predicates against a finished scan.
///
/// `scan_count` is the cumulative count including this scan. Badges
/// already in `unlocked` never fire again.
pub fn evaluate<S: AsRef<str>>(
    result: &ScoreSet,
    scan_count: u64,
    is_premium: bool,
    unlocked: &[S],
    mode: Mode,
    timestamp: i64,
) -> Evaluation {
    let newly_unlocked = CATALOG
        .iter()
        .filter(|b| is_premium || !b.premium)
        .filter(|b| !unlocked.iter().any(|u| u.as_ref() == b.id))
        .filter(|b| is_earned(b, result, scan_count))
        .map(|b| b.id.to_string())
        .collect();

    Evaluation {
        newly_unlocked,
        history_entry: HistoryEntry {
            timestamp,
            aura: result.aura,
            vibe: result.main_vibe,
            mode,
        },
    }
}
