//! Free-tier limits: scans per day and premium-only modes.

use crate::store::{get_or_default, KeyValueStore, KEY_DAILY_COUNT, KEY_LAST_DATE};
use crate::types::Mode;
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

/// Scans a free user may start per calendar day.
pub const DEFAULT_FREE_DAILY_SCANS: u32 = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("mode '{0}' requires premium")]
    PremiumRequired(Mode),
}

/// Check whether `mode` is available to this user.
pub fn select_mode(requested: Mode, is_premium: bool) -> Result<Mode, ModeError> {
    if requested.is_premium() && !is_premium {
        return Err(ModeError::PremiumRequired(requested));
    }
    Ok(requested)
}

/// Whether another scan may start today.
///
/// Premium users are never limited. On the first check of a new day the
/// daily counter is reset; a failed reset is logged and the scan allowed.
pub fn can_scan_today<S: KeyValueStore + ?Sized>(
    store: &mut S,
    is_premium: bool,
    today: NaiveDate,
    free_daily_scans: u32,
) -> bool {
    if is_premium {
        return true;
    }

    let today_str = today.format("%Y-%m-%d").to_string();
    let last_date: Option<String> = get_or_default(&*store, KEY_LAST_DATE);

    if last_date.as_deref() != Some(today_str.as_str()) {
        tracing::debug!(date = %today_str, "new day; resetting daily scan count");
        let reset = store
            .set(KEY_LAST_DATE, json!(today_str))
            .and_then(|_| store.set(KEY_DAILY_COUNT, json!(0)));
        if let Err(e) = reset {
            tracing::warn!(error = %e, "failed to reset daily scan count");
        }
        return true;
    }

    daily_count(&*store) < free_daily_scans
}

/// Scans finished today, as recorded.
pub fn daily_count<S: KeyValueStore + ?Sized>(store: &S) -> u32 {
    get_or_default(store, KEY_DAILY_COUNT)
}
