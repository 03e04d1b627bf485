use crate::models::DailyRecord;
use chrono::Duration;
use tracing::debug;

/// Insert an all-missing record for every calendar day absent between two
/// consecutive records, so the series is regularly spaced.
///
/// Records that are duplicated or out of order are kept where they are; the
/// integrity checker reports them.
pub fn fill_calendar_gaps(records: &[DailyRecord]) -> Vec<DailyRecord> {
    let mut filled = Vec::with_capacity(records.len());
    let mut inserted = 0usize;

    for record in records {
        if let Some(prev) = filled.last().map(|r: &DailyRecord| r.date) {
            let mut next = prev + Duration::days(1);
            while next < record.date {
                filled.push(DailyRecord::from_date(
                    next,
                    f64::NAN,
                    f64::NAN,
                    f64::NAN,
                    f64::NAN,
                ));
                inserted += 1;
                next += Duration::days(1);
            }
        }
        filled.push(*record);
    }

    if inserted > 0 {
        debug!("Inserted {} missing days into the series", inserted);
    }

    filled
}

/// Number of calendar days missing between consecutive records
pub fn count_missing_days(records: &[DailyRecord]) -> usize {
    records
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days())
        .filter(|&gap| gap > 1)
        .map(|gap| (gap - 1) as usize)
        .sum()
}
