//! Trailing day window over the record log.

use bandit_core::{ExperimentLog, RetentionWindow, TrialRecord};

/// Records whose day falls inside `window`, counted back from the latest day.
///
/// With a window of `n` days the view keeps `day >= max_day - n + 1`.
/// The log itself is never modified; an empty log yields an empty view.
pub fn filter_window(log: &ExperimentLog, window: RetentionWindow) -> &[TrialRecord] {
    let records = log.records();
    let (Some(length), Some(max_day)) = (window.length_days(), log.max_day()) else {
        return records;
    };

    let cutoff = (max_day + 1).saturating_sub(length);
    // Records are day-ordered, so the window is a suffix of the log.
    let start = records.partition_point(|r| r.day < cutoff);
    tracing::debug!(
        window = %window,
        cutoff,
        kept = records.len() - start,
        total = records.len(),
        "retention window applied"
    );
    &records[start..]
}
