use crate::shared::models::schema::auto_triggers::dsl as at;
use crate::shared::models::schema::organizations::dsl as og;
use crate::shared::models::schema::outreach_attempts::dsl as oa;
use crate::shared::models::schema::people::dsl as pe;
use crate::shared::models::{AutoTrigger, Organization, OutreachAttempt, Person, TriggerKind};
use crate::shared::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub mod dedup;
pub mod executor;
pub mod quota;
pub mod retry;
pub mod triggers;
pub mod window;

pub const SKIP_MINUTE_LIMIT: &str = "minute_limit_reached";
pub const SKIP_OUTSIDE_WINDOW: &str = "outside_calling_window";
pub const SKIP_NO_TRIGGERS: &str = "no_triggers_enabled";
pub const SKIP_TRIGGER_FETCH: &str = "trigger_fetch_error";
pub const SKIP_INTERNAL_ERROR: &str = "internal_error";

#[derive(Debug, thiserror::Error)]
pub enum OutreachError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Connection pool error: {0}")]
    Pool(String),
}

impl From<diesel::result::Error> for OutreachError {
    fn from(e: diesel::result::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for OutreachError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Pool(e.to_string())
    }
}

impl IntoResponse for OutreachError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

/// What one tick did (or why it did nothing) for one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgTickSummary {
    pub org_id: Uuid,
    pub org_name: String,
    pub triggered: usize,
    pub retried: usize,
    pub executed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl OrgTickSummary {
    fn skipped(org: &Organization, reason: &str) -> Self {
        Self {
            org_id: org.id,
            org_name: org.name.clone(),
            triggered: 0,
            retried: 0,
            executed: 0,
            skipped: Some(reason.to_string()),
        }
    }
}

/// One scheduler pass over every organization. Each tenant is processed
/// inside its own error containment: a failure in one organization is
/// recorded in its summary and the loop moves on.
pub async fn run_tick(state: Arc<AppState>) -> Result<Vec<OrgTickSummary>, OutreachError> {
    let orgs: Vec<Organization> = {
        let mut conn = state.conn.get()?;
        og::organizations.order(og::name.asc()).load(&mut conn)?
    };
    let now = Utc::now();

    let mut summaries = Vec::with_capacity(orgs.len());
    for org in orgs {
        match process_org(&state, &org, now).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!("Tick failed for {} ({}): {}", org.name, org.id, e);
                summaries.push(OrgTickSummary::skipped(&org, SKIP_INTERNAL_ERROR));
            }
        }
    }

    info!("Outreach tick processed {} organizations", summaries.len());
    Ok(summaries)
}

async fn process_org(
    state: &AppState,
    org: &Organization,
    now: DateTime<Utc>,
) -> Result<OrgTickSummary, OutreachError> {
    let quota = {
        let mut conn = state.conn.get()?;
        quota::check_minute_quota(&mut conn, org.id)?
    };
    if !quota.allowed {
        info!(
            "Skipping {}: {} of {} minutes used",
            org.name, quota.minutes_used, quota.minutes_included
        );
        return Ok(OrgTickSummary::skipped(org, SKIP_MINUTE_LIMIT));
    }

    if !window::window_permits(
        org.calling_window_start.as_deref(),
        org.calling_window_end.as_deref(),
        org.timezone.as_deref(),
        now,
    ) {
        return Ok(OrgTickSummary::skipped(org, SKIP_OUTSIDE_WINDOW));
    }

    let enabled_triggers: Vec<AutoTrigger> = {
        let mut conn = state.conn.get()?;
        match at::auto_triggers
            .filter(at::org_id.eq(org.id))
            .filter(at::enabled.eq(true))
            .load(&mut conn)
        {
            Ok(triggers) => triggers,
            Err(e) => {
                warn!("Could not load triggers for {}: {}", org.name, e);
                return Ok(OrgTickSummary::skipped(org, SKIP_TRIGGER_FETCH));
            }
        }
    };
    if enabled_triggers.is_empty() {
        return Ok(OrgTickSummary::skipped(org, SKIP_NO_TRIGGERS));
    }

    let tz = window::resolve_timezone(org.timezone.as_deref());
    let today = now.with_timezone(&tz).date_naive();

    let (triggered, retried) = {
        let mut conn = state.conn.get()?;
        let people: Vec<Person> = pe::people.filter(pe::org_id.eq(org.id)).load(&mut conn)?;

        let mut candidates = Vec::new();
        for trigger in &enabled_triggers {
            match TriggerKind::from_str(&trigger.trigger_kind) {
                Some(TriggerKind::FirstTimer) => {
                    candidates.extend(triggers::first_timer_candidates(trigger, now, &people));
                }
                Some(TriggerKind::Birthday) => {
                    candidates.extend(triggers::birthday_candidates(trigger, today, &people));
                }
                Some(TriggerKind::Anniversary) => {
                    candidates.extend(triggers::anniversary_candidates(trigger, tz, today, &people));
                }
                None => {
                    warn!(
                        "Ignoring unknown trigger kind {:?} for {}",
                        trigger.trigger_kind, org.name
                    );
                }
            }
        }

        (
            dedup::schedule_candidates(&mut conn, org.id, today, now, &candidates)?,
            retry::requeue_failed(&mut conn, org.id, now)?,
        )
    };

    let executed = executor::execute_due_attempts(state, org, now).await?;

    Ok(OrgTickSummary {
        org_id: org.id,
        org_name: org.name.clone(),
        triggered,
        retried,
        executed,
        skipped: None,
    })
}

pub fn configure_outreach_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/outreach/run", post(run_tick_handler))
        .route("/api/outreach/attempts/:org_id", get(list_attempts_handler))
}

async fn run_tick_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OrgTickSummary>>, OutreachError> {
    Ok(Json(run_tick(state).await?))
}

async fn list_attempts_handler(
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<OutreachAttempt>>, OutreachError> {
    let pool = state.conn.clone();
    let attempts = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(OutreachError::from)?;
        oa::outreach_attempts
            .filter(oa::org_id.eq(org_id))
            .order(oa::created_at.desc())
            .limit(50)
            .load::<OutreachAttempt>(&mut conn)
            .map_err(OutreachError::from)
    })
    .await
    .map_err(|e| OutreachError::Database(e.to_string()))??;

    Ok(Json(attempts))
}
