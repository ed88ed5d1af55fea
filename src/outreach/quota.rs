use crate::shared::models::schema::minute_usage::dsl as mu;
use crate::shared::models::MinuteUsage;
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub minutes_included: i32,
    pub minutes_used: i32,
}

/// An organization at or past its included minutes is blocked unless an
/// overage was explicitly approved.
pub fn minute_limit_reached(minutes_used: i32, minutes_included: i32, overage_approved: bool) -> bool {
    minutes_used >= minutes_included && !overage_approved
}

/// Reads the organization's latest billing-period usage. The gate is
/// evaluated once per tick; an organization without a usage row is
/// allowed through.
pub fn check_minute_quota(
    conn: &mut PgConnection,
    org_id: Uuid,
) -> Result<QuotaDecision, diesel::result::Error> {
    let usage: Option<MinuteUsage> = mu::minute_usage
        .filter(mu::org_id.eq(org_id))
        .order(mu::period_start.desc())
        .first(conn)
        .optional()?;

    Ok(match usage {
        Some(usage) => QuotaDecision {
            allowed: !minute_limit_reached(
                usage.minutes_used,
                usage.minutes_included,
                usage.overage_approved,
            ),
            minutes_included: usage.minutes_included,
            minutes_used: usage.minutes_used,
        },
        None => QuotaDecision {
            allowed: true,
            minutes_included: 0,
            minutes_used: 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_the_limit_is_allowed() {
        assert!(!minute_limit_reached(119, 120, false));
    }

    #[test]
    fn exactly_at_the_limit_is_blocked() {
        assert!(minute_limit_reached(120, 120, false));
    }

    #[test]
    fn past_the_limit_is_blocked() {
        assert!(minute_limit_reached(200, 120, false));
    }

    #[test]
    fn approved_overage_unblocks() {
        assert!(!minute_limit_reached(200, 120, true));
    }
}
