use time::{Duration, PrimitiveDateTime};

use crate::db::types::AttemptStatus;

/// Personal deadline of an attempt: its own start plus the exam duration.
/// The exam window bounds when an attempt may *start*, not when it ends, so
/// the deadline may fall past `window_end`.
pub(crate) fn attempt_deadline(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
) -> PrimitiveDateTime {
    started_at + Duration::minutes(duration_minutes as i64)
}

pub(crate) fn is_elapsed(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> bool {
    now > attempt_deadline(started_at, duration_minutes)
}

/// What an attempt's status *means* right now, independent of what is
/// persisted. An overdue live attempt reads as invalid; the stored row only
/// catches up when the next start call observes it.
pub(crate) fn effective_status(
    status: AttemptStatus,
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> AttemptStatus {
    match status {
        AttemptStatus::InProgress if is_elapsed(started_at, duration_minutes, now) => {
            AttemptStatus::Invalid
        }
        other => other,
    }
}
