use crate::channels::voice_call::StartCallRequest;
use crate::memory;
use crate::outreach::retry::MAX_ATTEMPT_RETRIES;
use crate::outreach::window::resolve_timezone;
use crate::outreach::OutreachError;
use crate::shared::models::schema::call_scripts::dsl as cs;
use crate::shared::models::schema::outreach_attempts::dsl as oa;
use crate::shared::models::schema::people::dsl as pe;
use crate::shared::models::{AttemptStatus, CallScript, Organization, OutreachAttempt, Person};
use crate::shared::state::AppState;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{info, warn};
use uuid::Uuid;

/// Dispatches per organization per tick are capped so one invocation's
/// wall-clock time stays bounded.
pub const DISPATCH_BATCH_LIMIT: i64 = 10;

const MISSING_PHONE_REASON: &str = "no phone number on record";
const MISSING_PERSON_REASON: &str = "person no longer exists";
const MISSING_SCRIPT_REASON: &str = "call script not found";

const OPENING_LINE_TEMPLATE: &str =
    "Hi {first_name}! This is {church_name} reaching out to check in with you.";

/// Fills a script template's placeholders. `{pastor_name}` resolves to an
/// empty string until the staffing directory lands.
pub fn render_script(
    template: &str,
    first_name: &str,
    last_name: &str,
    church_name: &str,
    day_of_week: &str,
) -> String {
    template
        .replace("{first_name}", first_name)
        .replace("{last_name}", last_name)
        .replace("{church_name}", church_name)
        .replace("{day_of_week}", day_of_week)
        .replace("{pastor_name}", "")
}

/// Runs every due `scheduled` attempt for the organization, sequentially,
/// up to the batch cap. Returns how many dispatches the provider accepted.
pub async fn execute_due_attempts(
    state: &AppState,
    org: &Organization,
    now: DateTime<Utc>,
) -> Result<usize, OutreachError> {
    let tz = resolve_timezone(org.timezone.as_deref());
    let day_of_week = now.with_timezone(&tz).format("%A").to_string();

    let mut conn = state.conn.get()?;
    let due: Vec<OutreachAttempt> = oa::outreach_attempts
        .filter(oa::org_id.eq(org.id))
        .filter(oa::status.eq(AttemptStatus::Scheduled.as_str()))
        .filter(oa::scheduled_at.le(now))
        .order(oa::scheduled_at.asc())
        .limit(DISPATCH_BATCH_LIMIT)
        .load(&mut conn)?;

    let mut executed = 0;
    for attempt in due {
        // The claim is persisted before the provider call so a tick that
        // dies mid-dispatch cannot double-dial on the next run.
        let claimed = diesel::update(
            oa::outreach_attempts
                .filter(oa::id.eq(attempt.id))
                .filter(oa::status.eq(AttemptStatus::Scheduled.as_str()))
                .filter(oa::dispatch_started_at.is_null()),
        )
        .set(oa::dispatch_started_at.eq(now))
        .execute(&mut conn)?;
        if claimed == 0 {
            continue;
        }

        let phone = match attempt.phone.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => phone.to_string(),
            _ => {
                mark_terminal_failure(&mut conn, attempt.id, MISSING_PHONE_REASON)?;
                continue;
            }
        };

        let person: Option<Person> = pe::people
            .filter(pe::id.eq(attempt.person_id))
            .filter(pe::org_id.eq(org.id))
            .first(&mut conn)
            .optional()?;
        let Some(person) = person else {
            mark_terminal_failure(&mut conn, attempt.id, MISSING_PERSON_REASON)?;
            continue;
        };

        let script: Option<CallScript> = cs::call_scripts
            .filter(cs::id.eq(attempt.script_id))
            .filter(cs::org_id.eq(org.id))
            .first(&mut conn)
            .optional()?;
        let Some(script) = script else {
            mark_terminal_failure(&mut conn, attempt.id, MISSING_SCRIPT_REASON)?;
            continue;
        };

        let last_name = person.last_name.as_deref().unwrap_or("");
        let rendered = render_script(
            &script.template,
            &person.first_name,
            last_name,
            &org.name,
            &day_of_week,
        );
        let opening = render_script(
            OPENING_LINE_TEMPLATE,
            &person.first_name,
            last_name,
            &org.name,
            &day_of_week,
        );

        let context = memory::retrieve_call_context(state, org.id, person.id).await;
        let system_prompt = memory::augment_prompt(&rendered, &context);

        let request = StartCallRequest {
            phone_number: phone,
            from_number_id: org
                .from_number_id
                .clone()
                .or_else(|| state.voice.default_from_number_id()),
            first_message: opening,
            system_prompt,
            model: state.voice.model().to_string(),
            voice_id: script
                .voice_id
                .clone()
                .unwrap_or_else(|| state.voice.default_voice_id().to_string()),
        };

        match state.voice.start_call(&request).await {
            Ok(call) => {
                diesel::update(oa::outreach_attempts.filter(oa::id.eq(attempt.id)))
                    .set((
                        oa::status.eq(AttemptStatus::InProgress.as_str()),
                        oa::provider_call_id.eq(Some(call.id.clone())),
                        oa::started_at.eq(Some(now)),
                    ))
                    .execute(&mut conn)?;
                info!(
                    "Dispatched call {} for person {} (attempt {})",
                    call.id, person.id, attempt.id
                );
                executed += 1;
            }
            Err(e) => {
                warn!("Dispatch failed for attempt {}: {}", attempt.id, e);
                diesel::update(oa::outreach_attempts.filter(oa::id.eq(attempt.id)))
                    .set((
                        oa::status.eq(AttemptStatus::Failed.as_str()),
                        oa::error_message.eq(Some(e.to_string())),
                        oa::retry_count.eq(oa::retry_count + 1),
                        oa::dispatch_started_at.eq(None::<DateTime<Utc>>),
                    ))
                    .execute(&mut conn)?;
            }
        }
    }

    Ok(executed)
}

/// Data-integrity failures cannot succeed on a rerun, so the retry count
/// is pinned at the bound to keep the retry manager away from them.
fn mark_terminal_failure(
    conn: &mut PgConnection,
    attempt_id: Uuid,
    reason: &str,
) -> Result<(), diesel::result::Error> {
    diesel::update(oa::outreach_attempts.filter(oa::id.eq(attempt_id)))
        .set((
            oa::status.eq(AttemptStatus::Failed.as_str()),
            oa::error_message.eq(Some(reason.to_string())),
            oa::retry_count.eq(MAX_ATTEMPT_RETRIES),
        ))
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_all_placeholders() {
        let rendered = render_script(
            "Hello {first_name} {last_name}, happy {day_of_week} from {church_name}!",
            "Dana",
            "Whitfield",
            "Grace Fellowship",
            "Thursday",
        );
        assert_eq!(
            rendered,
            "Hello Dana Whitfield, happy Thursday from Grace Fellowship!"
        );
    }

    #[test]
    fn pastor_placeholder_renders_empty() {
        let rendered = render_script(
            "{pastor_name} asked us to call you, {first_name}.",
            "Dana",
            "",
            "Grace Fellowship",
            "Thursday",
        );
        assert_eq!(rendered, " asked us to call you, Dana.");
    }

    #[test]
    fn render_leaves_unknown_placeholders_alone() {
        let rendered = render_script("{greeting}, {first_name}!", "Dana", "", "", "");
        assert_eq!(rendered, "{greeting}, Dana!");
    }

    #[test]
    fn opening_line_is_personalized() {
        let opening = render_script(
            OPENING_LINE_TEMPLATE,
            "Dana",
            "Whitfield",
            "Grace Fellowship",
            "Thursday",
        );
        assert_eq!(
            opening,
            "Hi Dana! This is Grace Fellowship reaching out to check in with you."
        );
    }
}
