use chrono::{Duration, NaiveDate};

use crate::error::{HistoryError, Result};

/// Span the historical endpoints accept in a single request.
pub const DEFAULT_MAX_SPAN_DAYS: u32 = 100;

/// Inclusive `[start, end]` window of trading dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Break `[from, to]` into ascending, contiguous windows where `end - start` never exceeds
/// `max_span_days`.
pub fn split_date_range(
    from: NaiveDate,
    to: NaiveDate,
    max_span_days: u32,
) -> Result<Vec<DateRange>> {
    if from > to {
        return Err(HistoryError::InvalidRange { from, to });
    }

    let span = Duration::days(i64::from(max_span_days));
    let mut ranges = Vec::new();
    let mut start = from;

    loop {
        let end = start
            .checked_add_signed(span)
            .map_or(to, |candidate| candidate.min(to));
        ranges.push(DateRange { start, end });

        match end.succ_opt() {
            Some(next) if next <= to => start = next,
            _ => break,
        }
    }

    Ok(ranges)
}
