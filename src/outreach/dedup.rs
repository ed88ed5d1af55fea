use crate::outreach::triggers::CandidateCall;
use crate::shared::models::schema::outreach_attempts::dsl as oa;
use crate::shared::models::{AttemptStatus, OutreachAttempt, TriggerKind};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// The dedup bucket an attempt occupies: first-timer calls happen once
/// ever, birthday calls once per local day, anniversary calls once per
/// local month. Together with the partial unique index on
/// (person_id, trigger_kind, recurrence_key) this makes scheduling
/// idempotent even under concurrent ticks.
pub fn recurrence_key(kind: TriggerKind, local_date: NaiveDate) -> String {
    match kind {
        TriggerKind::FirstTimer => "once".to_string(),
        TriggerKind::Birthday => format!("day:{}", local_date.format("%Y-%m-%d")),
        TriggerKind::Anniversary => format!("month:{}", local_date.format("%Y-%m")),
    }
}

/// Persists candidates as `scheduled` attempts. A candidate whose bucket
/// already holds an attempt is silently discarded; the return value
/// counts only the rows actually inserted.
pub fn schedule_candidates(
    conn: &mut PgConnection,
    org_id: Uuid,
    local_date: NaiveDate,
    now: DateTime<Utc>,
    candidates: &[CandidateCall],
) -> Result<usize, diesel::result::Error> {
    let mut scheduled = 0;
    for candidate in candidates {
        let attempt = OutreachAttempt {
            id: Uuid::new_v4(),
            org_id,
            person_id: candidate.person_id,
            script_id: candidate.script_id,
            trigger_kind: Some(candidate.kind.as_str().to_string()),
            recurrence_key: Some(recurrence_key(candidate.kind, local_date)),
            phone: Some(candidate.phone.clone()),
            status: AttemptStatus::Scheduled.as_str().to_string(),
            scheduled_at: now,
            dispatch_started_at: None,
            provider_call_id: None,
            started_at: None,
            retry_count: 0,
            error_message: None,
            created_at: now,
        };
        scheduled += diesel::insert_into(oa::outreach_attempts)
            .values(&attempt)
            .on_conflict_do_nothing()
            .execute(conn)?;
    }
    Ok(scheduled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_timer_bucket_is_global() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(recurrence_key(TriggerKind::FirstTimer, date), "once");
        let other = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(
            recurrence_key(TriggerKind::FirstTimer, date),
            recurrence_key(TriggerKind::FirstTimer, other)
        );
    }

    #[test]
    fn birthday_bucket_is_the_local_day() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(recurrence_key(TriggerKind::Birthday, date), "day:2026-08-06");
    }

    #[test]
    fn anniversary_bucket_is_the_local_month() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(
            recurrence_key(TriggerKind::Anniversary, date),
            "month:2026-08"
        );
        let later_same_month = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert_eq!(
            recurrence_key(TriggerKind::Anniversary, date),
            recurrence_key(TriggerKind::Anniversary, later_same_month)
        );
    }
}
