use crate::shared::models::{
    AutoTrigger, Person, TriggerKind, STATUS_FIRST_TIME_VISITOR, STATUS_MEMBER,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

/// A person a trigger wants to call. Candidates carry no dedup state;
/// the scheduling guard decides whether one becomes an attempt.
#[derive(Debug, Clone)]
pub struct CandidateCall {
    pub person_id: Uuid,
    pub script_id: Uuid,
    pub phone: String,
    pub kind: TriggerKind,
}

fn eligible_phone(person: &Person) -> Option<String> {
    if person.do_not_call {
        return None;
    }
    match &person.phone {
        Some(phone) if !phone.trim().is_empty() => Some(phone.clone()),
        _ => None,
    }
}

/// First-time visitors whose directory entry was created inside the
/// one-hour slot ending exactly `delay_hours` before `now`. The bounded
/// slot keeps the evaluator from re-emitting a person on every tick once
/// they age past the delay.
pub fn first_timer_candidates(
    trigger: &AutoTrigger,
    now: DateTime<Utc>,
    people: &[Person],
) -> Vec<CandidateCall> {
    let slot_end = now - Duration::hours(trigger.delay_hours as i64);
    let slot_start = slot_end - Duration::hours(1);

    people
        .iter()
        .filter(|p| p.membership_status == STATUS_FIRST_TIME_VISITOR)
        .filter(|p| p.created_at > slot_start && p.created_at <= slot_end)
        .filter_map(|p| {
            Some(CandidateCall {
                person_id: p.id,
                script_id: trigger.script_id,
                phone: eligible_phone(p)?,
                kind: TriggerKind::FirstTimer,
            })
        })
        .collect()
}

/// Everyone whose birth month and day match today's org-local date. No
/// year arithmetic; Feb 29 birthdays only match in leap years.
pub fn birthday_candidates(
    trigger: &AutoTrigger,
    today: NaiveDate,
    people: &[Person],
) -> Vec<CandidateCall> {
    people
        .iter()
        .filter(|p| {
            p.birth_date
                .map(|b| b.month() == today.month() && b.day() == today.day())
                .unwrap_or(false)
        })
        .filter_map(|p| {
            Some(CandidateCall {
                person_id: p.id,
                script_id: trigger.script_id,
                phone: eligible_phone(p)?,
                kind: TriggerKind::Birthday,
            })
        })
        .collect()
}

/// Members whose org-local join day-of-month matches today's, at a whole
/// month count listed in the trigger's milestones. A day-31 join never
/// matches a shorter month.
pub fn anniversary_candidates(
    trigger: &AutoTrigger,
    tz: Tz,
    today: NaiveDate,
    people: &[Person],
) -> Vec<CandidateCall> {
    people
        .iter()
        .filter(|p| p.membership_status == STATUS_MEMBER)
        .filter(|p| {
            let joined = p.created_at.with_timezone(&tz).date_naive();
            if joined.day() != today.day() {
                return false;
            }
            let months = months_between(joined, today);
            months > 0 && trigger.milestone_months.contains(&months)
        })
        .filter_map(|p| {
            Some(CandidateCall {
                person_id: p.id,
                script_id: trigger.script_id,
                phone: eligible_phone(p)?,
                kind: TriggerKind::Anniversary,
            })
        })
        .collect()
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn person(status: &str, phone: Option<&str>, created_at: DateTime<Utc>) -> Person {
        Person {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            first_name: "Dana".to_string(),
            last_name: Some("Whitfield".to_string()),
            phone: phone.map(String::from),
            membership_status: status.to_string(),
            do_not_call: false,
            birth_date: None,
            created_at,
        }
    }

    fn trigger(kind: TriggerKind) -> AutoTrigger {
        AutoTrigger {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            trigger_kind: kind.as_str().to_string(),
            enabled: true,
            script_id: Uuid::new_v4(),
            delay_hours: 24,
            milestone_months: vec![1, 6, 12],
            created_at: Utc::now(),
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn first_timer_fires_at_exactly_the_configured_delay() {
        let now = at(2026, 8, 6, 12);
        let visitor = person(STATUS_FIRST_TIME_VISITOR, Some("+15551234567"), now - Duration::hours(24));

        let candidates = first_timer_candidates(&trigger(TriggerKind::FirstTimer), now, &[visitor]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, TriggerKind::FirstTimer);
    }

    #[test]
    fn first_timer_slot_is_one_hour_wide() {
        let now = at(2026, 8, 6, 12);
        let too_old = person(
            STATUS_FIRST_TIME_VISITOR,
            Some("+15551234567"),
            now - Duration::hours(25) - Duration::minutes(1),
        );
        let too_fresh = person(
            STATUS_FIRST_TIME_VISITOR,
            Some("+15551234567"),
            now - Duration::hours(23),
        );
        let in_slot = person(
            STATUS_FIRST_TIME_VISITOR,
            Some("+15551234567"),
            now - Duration::hours(24) - Duration::minutes(30),
        );

        let candidates = first_timer_candidates(
            &trigger(TriggerKind::FirstTimer),
            now,
            &[too_old, too_fresh, in_slot.clone()],
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].person_id, in_slot.id);
    }

    #[test]
    fn do_not_call_and_missing_phone_are_never_candidates() {
        let now = at(2026, 8, 6, 12);
        let mut flagged = person(STATUS_FIRST_TIME_VISITOR, Some("+15551234567"), now - Duration::hours(24));
        flagged.do_not_call = true;
        let phoneless = person(STATUS_FIRST_TIME_VISITOR, None, now - Duration::hours(24));
        let blank_phone = person(STATUS_FIRST_TIME_VISITOR, Some("  "), now - Duration::hours(24));

        let candidates = first_timer_candidates(
            &trigger(TriggerKind::FirstTimer),
            now,
            &[flagged, phoneless, blank_phone],
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn members_are_not_first_timer_candidates() {
        let now = at(2026, 8, 6, 12);
        let member = person(STATUS_MEMBER, Some("+15551234567"), now - Duration::hours(24));

        let candidates = first_timer_candidates(&trigger(TriggerKind::FirstTimer), now, &[member]);
        assert!(candidates.is_empty());
    }

    #[test]
    fn birthday_matches_month_and_day_only() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let mut celebrant = person(STATUS_MEMBER, Some("+15551234567"), at(2020, 1, 1, 0));
        celebrant.birth_date = NaiveDate::from_ymd_opt(1981, 8, 6);
        let mut off_by_a_day = person(STATUS_MEMBER, Some("+15559876543"), at(2020, 1, 1, 0));
        off_by_a_day.birth_date = NaiveDate::from_ymd_opt(1981, 8, 7);
        let no_birth_date = person(STATUS_MEMBER, Some("+15550001111"), at(2020, 1, 1, 0));

        let candidates = birthday_candidates(
            &trigger(TriggerKind::Birthday),
            today,
            &[celebrant.clone(), off_by_a_day, no_birth_date],
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].person_id, celebrant.id);
    }

    #[test]
    fn feb_29_birthday_only_matches_in_leap_years() {
        let mut leapling = person(STATUS_MEMBER, Some("+15551234567"), at(2020, 1, 1, 0));
        leapling.birth_date = NaiveDate::from_ymd_opt(2000, 2, 29);

        let non_leap = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert!(birthday_candidates(&trigger(TriggerKind::Birthday), non_leap, &[leapling.clone()])
            .is_empty());

        let leap = NaiveDate::from_ymd_opt(2028, 2, 29).unwrap();
        assert_eq!(
            birthday_candidates(&trigger(TriggerKind::Birthday), leap, &[leapling]).len(),
            1
        );
    }

    #[test]
    fn anniversary_fires_only_on_milestone_months() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let six_months = person(STATUS_MEMBER, Some("+15551234567"), at(2026, 2, 6, 10));
        let five_months = person(STATUS_MEMBER, Some("+15559876543"), at(2026, 3, 6, 10));

        let candidates = anniversary_candidates(
            &trigger(TriggerKind::Anniversary),
            Tz::UTC,
            today,
            &[six_months.clone(), five_months],
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].person_id, six_months.id);
    }

    #[test]
    fn anniversary_requires_matching_day_of_month() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let joined_on_the_fifth = person(STATUS_MEMBER, Some("+15551234567"), at(2026, 2, 5, 10));

        let candidates = anniversary_candidates(
            &trigger(TriggerKind::Anniversary),
            Tz::UTC,
            today,
            &[joined_on_the_fifth],
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn day_31_join_never_matches_short_months() {
        // Joined January 31; June has 30 days, so the 5-month milestone
        // can never land even though 5 is configured.
        let today = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let joined = person(STATUS_MEMBER, Some("+15551234567"), at(2026, 1, 31, 10));
        let mut t = trigger(TriggerKind::Anniversary);
        t.milestone_months = vec![5];

        assert!(anniversary_candidates(&t, Tz::UTC, today, &[joined]).is_empty());
    }

    #[test]
    fn anniversary_ignores_non_members() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let visitor = person(STATUS_FIRST_TIME_VISITOR, Some("+15551234567"), at(2026, 2, 6, 10));

        let candidates =
            anniversary_candidates(&trigger(TriggerKind::Anniversary), Tz::UTC, today, &[visitor]);
        assert!(candidates.is_empty());
    }

    #[test]
    fn anniversary_uses_org_local_join_date() {
        // Joined 2026-02-07 01:00 UTC, which is still 2026-02-06 in
        // Chicago. The 6-month milestone lands on the local 6th.
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let joined = person(STATUS_MEMBER, Some("+15551234567"), at(2026, 2, 7, 1));

        let candidates = anniversary_candidates(
            &trigger(TriggerKind::Anniversary),
            chrono_tz::America::Chicago,
            today,
            &[joined],
        );
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn zero_month_anniversary_never_fires() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let joined_today = person(STATUS_MEMBER, Some("+15551234567"), at(2026, 8, 6, 0));
        let mut t = trigger(TriggerKind::Anniversary);
        t.milestone_months = vec![0, 6];

        assert!(anniversary_candidates(&t, Tz::UTC, today, &[joined_today]).is_empty());
    }
}
