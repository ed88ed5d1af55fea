use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_FIRST_TIME_VISITOR: &str = "first_time_visitor";
pub const STATUS_MEMBER: &str = "member";

pub const MEMORY_CATEGORY_CALL_SUMMARY: &str = "call_summary";
pub const MEMORY_CATEGORY_PRAYER_REQUEST: &str = "prayer_request";
pub const MEMORY_CATEGORY_PERSONAL_NOTE: &str = "personal_note";
pub const MEMORY_CATEGORY_PREFERENCE: &str = "preference";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    FirstTimer,
    Birthday,
    Anniversary,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTimer => "first_timer",
            Self::Birthday => "birthday",
            Self::Anniversary => "anniversary",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "first_timer" => Some(Self::FirstTimer),
            "birthday" => Some(Self::Birthday),
            "anniversary" => Some(Self::Anniversary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Scheduled,
    InProgress,
    Completed,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub timezone: Option<String>,
    pub calling_window_start: Option<String>,
    pub calling_window_end: Option<String>,
    pub from_number_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = people)]
pub struct Person {
    pub id: Uuid,
    pub org_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub membership_status: String,
    pub do_not_call: bool,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = auto_triggers)]
pub struct AutoTrigger {
    pub id: Uuid,
    pub org_id: Uuid,
    pub trigger_kind: String,
    pub enabled: bool,
    pub script_id: Uuid,
    pub delay_hours: i32,
    pub milestone_months: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = call_scripts)]
pub struct CallScript {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub template: String,
    pub voice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = outreach_attempts)]
pub struct OutreachAttempt {
    pub id: Uuid,
    pub org_id: Uuid,
    pub person_id: Uuid,
    pub script_id: Uuid,
    pub trigger_kind: Option<String>,
    pub recurrence_key: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub dispatch_started_at: Option<DateTime<Utc>>,
    pub provider_call_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = member_memories)]
pub struct MemberMemory {
    pub id: Uuid,
    pub person_id: Uuid,
    pub org_id: Uuid,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = church_memories)]
pub struct ChurchMemory {
    pub id: Uuid,
    pub org_id: Uuid,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = minute_usage)]
pub struct MinuteUsage {
    pub id: Uuid,
    pub org_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub minutes_included: i32,
    pub minutes_used: i32,
    pub overage_approved: bool,
}

pub mod schema {
    diesel::table! {
        organizations (id) {
            id -> Uuid,
            name -> Text,
            timezone -> Nullable<Text>,
            calling_window_start -> Nullable<Text>,
            calling_window_end -> Nullable<Text>,
            from_number_id -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        people (id) {
            id -> Uuid,
            org_id -> Uuid,
            first_name -> Text,
            last_name -> Nullable<Text>,
            phone -> Nullable<Text>,
            membership_status -> Text,
            do_not_call -> Bool,
            birth_date -> Nullable<Date>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        auto_triggers (id) {
            id -> Uuid,
            org_id -> Uuid,
            trigger_kind -> Text,
            enabled -> Bool,
            script_id -> Uuid,
            delay_hours -> Int4,
            milestone_months -> Array<Int4>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        call_scripts (id) {
            id -> Uuid,
            org_id -> Uuid,
            name -> Text,
            template -> Text,
            voice_id -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        outreach_attempts (id) {
            id -> Uuid,
            org_id -> Uuid,
            person_id -> Uuid,
            script_id -> Uuid,
            trigger_kind -> Nullable<Text>,
            recurrence_key -> Nullable<Text>,
            phone -> Nullable<Text>,
            status -> Text,
            scheduled_at -> Timestamptz,
            dispatch_started_at -> Nullable<Timestamptz>,
            provider_call_id -> Nullable<Text>,
            started_at -> Nullable<Timestamptz>,
            retry_count -> Int4,
            error_message -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        member_memories (id) {
            id -> Uuid,
            person_id -> Uuid,
            org_id -> Uuid,
            content -> Text,
            category -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        church_memories (id) {
            id -> Uuid,
            org_id -> Uuid,
            content -> Text,
            category -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        minute_usage (id) {
            id -> Uuid,
            org_id -> Uuid,
            period_start -> Date,
            period_end -> Date,
            minutes_included -> Int4,
            minutes_used -> Int4,
            overage_approved -> Bool,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(
        organizations,
        people,
        auto_triggers,
        call_scripts,
        outreach_attempts,
        member_memories,
        church_memories,
        minute_usage
    );
}

pub use schema::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_kind_round_trips_through_str() {
        for kind in [
            TriggerKind::FirstTimer,
            TriggerKind::Birthday,
            TriggerKind::Anniversary,
        ] {
            assert_eq!(TriggerKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TriggerKind::from_str("campaign"), None);
    }

    #[test]
    fn attempt_status_strings_are_stable() {
        assert_eq!(AttemptStatus::Scheduled.as_str(), "scheduled");
        assert_eq!(AttemptStatus::InProgress.as_str(), "in_progress");
        assert_eq!(AttemptStatus::Completed.as_str(), "completed");
        assert_eq!(AttemptStatus::Failed.as_str(), "failed");
    }
}
