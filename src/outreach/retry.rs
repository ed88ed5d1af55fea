use crate::shared::models::schema::outreach_attempts::dsl as oa;
use crate::shared::models::AttemptStatus;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub const MAX_ATTEMPT_RETRIES: i32 = 2;
pub const RETRY_LOOKBACK_HOURS: i64 = 24;

/// A failed attempt may be requeued while it is younger than the lookback
/// window and under the retry bound. Anything else is terminal.
pub fn retry_eligible(
    status: &str,
    retry_count: i32,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    status == AttemptStatus::Failed.as_str()
        && retry_count < MAX_ATTEMPT_RETRIES
        && created_at > now - Duration::hours(RETRY_LOOKBACK_HOURS)
}

/// Resets eligible failed attempts back to `scheduled` with a fresh
/// timestamp and a cleared dispatch claim. `retry_count` is left alone;
/// the executor increments it when a dispatch fails.
pub fn requeue_failed(
    conn: &mut PgConnection,
    org_id: Uuid,
    now: DateTime<Utc>,
) -> Result<usize, diesel::result::Error> {
    let cutoff = now - Duration::hours(RETRY_LOOKBACK_HOURS);
    diesel::update(
        oa::outreach_attempts
            .filter(oa::org_id.eq(org_id))
            .filter(oa::status.eq(AttemptStatus::Failed.as_str()))
            .filter(oa::retry_count.lt(MAX_ATTEMPT_RETRIES))
            .filter(oa::created_at.gt(cutoff)),
    )
    .set((
        oa::status.eq(AttemptStatus::Scheduled.as_str()),
        oa::scheduled_at.eq(now),
        oa::dispatch_started_at.eq(None::<DateTime<Utc>>),
    ))
    .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_failure_is_eligible() {
        assert!(retry_eligible(
            "failed",
            0,
            now() - Duration::hours(1),
            now()
        ));
        assert!(retry_eligible(
            "failed",
            1,
            now() - Duration::hours(23),
            now()
        ));
    }

    #[test]
    fn retry_bound_is_terminal() {
        assert!(!retry_eligible(
            "failed",
            MAX_ATTEMPT_RETRIES,
            now() - Duration::hours(1),
            now()
        ));
    }

    #[test]
    fn old_failures_are_terminal() {
        assert!(!retry_eligible(
            "failed",
            0,
            now() - Duration::hours(25),
            now()
        ));
    }

    #[test]
    fn only_failed_attempts_are_requeued() {
        assert!(!retry_eligible(
            "scheduled",
            0,
            now() - Duration::hours(1),
            now()
        ));
        assert!(!retry_eligible(
            "in_progress",
            0,
            now() - Duration::hours(1),
            now()
        ));
        assert!(!retry_eligible(
            "completed",
            0,
            now() - Duration::hours(1),
            now()
        ));
    }
}
