use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use log::warn;

/// Resolves an organization's IANA time zone, falling back to UTC when the
/// setting is absent or unparseable.
pub fn resolve_timezone(timezone: Option<&str>) -> Tz {
    match timezone {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!("Unrecognized time zone {:?}, falling back to UTC", name);
                Tz::UTC
            }
        },
        None => Tz::UTC,
    }
}

/// Tests whether `now` falls inside the organization's permitted calling
/// window, evaluated in the organization's local time. Incomplete window
/// configuration fails OPEN: outreach is permitted and a warning is
/// logged. Flagged for product review before changing to fail-closed.
pub fn window_permits(
    window_start: Option<&str>,
    window_end: Option<&str>,
    timezone: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    let (Some(start_raw), Some(end_raw), Some(tz_raw)) = (window_start, window_end, timezone)
    else {
        warn!("Calling window not fully configured, permitting outreach");
        return true;
    };

    let (Some(start), Some(end)) = (parse_hhmm(start_raw), parse_hhmm(end_raw)) else {
        warn!(
            "Unparseable calling window {:?}..{:?}, permitting outreach",
            start_raw, end_raw
        );
        return true;
    };

    let Ok(tz) = tz_raw.parse::<Tz>() else {
        warn!("Unrecognized time zone {:?}, permitting outreach", tz_raw);
        return true;
    };

    let local = now.with_timezone(&tz);
    let minute_of_day = local.hour() * 60 + local.minute();
    start <= minute_of_day && minute_of_day < end
}

fn parse_hhmm(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}
