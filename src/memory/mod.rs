use crate::shared::models::schema::member_memories::dsl as mm;
use crate::shared::models::{
    MemberMemory, MEMORY_CATEGORY_CALL_SUMMARY, MEMORY_CATEGORY_PERSONAL_NOTE,
    MEMORY_CATEGORY_PRAYER_REQUEST, MEMORY_CATEGORY_PREFERENCE,
};
use crate::shared::state::AppState;
use diesel::prelude::*;
use log::warn;
use std::collections::HashSet;
use uuid::Uuid;

pub mod embeddings;
pub mod vector;

use vector::MemoryHit;

/// Query text embedded for both memory stores. Deliberately generic: the
/// goal is to surface whatever the person talked about last, not to answer
/// a specific question.
pub const CONTEXT_QUERY: &str =
    "recent conversations, prayer requests, and personal information";

pub const MEMBER_EMBEDDING_DIM: u32 = 768;
pub const CHURCH_EMBEDDING_DIM: u32 = 1536;

pub const SIMILARITY_THRESHOLD: f32 = 0.5;
pub const PERSONAL_CONTEXT_LIMIT: usize = 5;
pub const RECENT_MEMORY_LIMIT: i64 = 3;
pub const CHURCH_CONTEXT_LIMIT: usize = 5;
pub const PREFERENCE_LIMIT: i64 = 5;

pub const MAX_PROMPT_CHARS: usize = 8000;
pub const TRUNCATION_MARKER: &str = "\n[context truncated]";

const STEERING_GUIDANCE: &str = "\n\nUse the context above to make the conversation \
personal and informed. Weave remembered details in naturally when they are relevant. \
Never mention records, databases, or notes, and never read the context back word for word.";

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub personal: Vec<String>,
    pub church: Vec<String>,
    pub preferences: Vec<String>,
}

impl CallContext {
    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.church.is_empty() && self.preferences.is_empty()
    }
}

/// Gathers everything known about a person and their church ahead of a
/// call. Never fails: any error inside the pipeline degrades to empty
/// context blocks so the call itself is not blocked.
pub async fn retrieve_call_context(state: &AppState, org_id: Uuid, person_id: Uuid) -> CallContext {
    match retrieve_inner(state, org_id, person_id).await {
        Ok(context) => context,
        Err(e) => {
            warn!("Context retrieval failed for person {}: {}", person_id, e);
            CallContext::default()
        }
    }
}

async fn retrieve_inner(
    state: &AppState,
    org_id: Uuid,
    person_id: Uuid,
) -> Result<CallContext, anyhow::Error> {
    let member_vector = state
        .embeddings
        .embed(CONTEXT_QUERY, MEMBER_EMBEDDING_DIM)
        .await?;
    let vector_hits = state
        .member_memory
        .search_member(
            person_id,
            member_vector,
            PERSONAL_CONTEXT_LIMIT as u64,
            SIMILARITY_THRESHOLD,
        )
        .await?;

    let (recent_hits, preferences) = {
        let mut conn = state.conn.get()?;
        (
            recent_member_memories(&mut conn, org_id, person_id)?,
            preference_lines(&mut conn, org_id, person_id)?,
        )
    };

    // The church block is optional enrichment. Its store uses a wider
    // vector, so the query is re-embedded rather than reused.
    let church_hits = match church_context(state, org_id).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!("Church context retrieval failed for org {}: {}", org_id, e);
            Vec::new()
        }
    };

    let merged = merge_hits(vector_hits, recent_hits, PERSONAL_CONTEXT_LIMIT);
    Ok(CallContext {
        personal: format_personal(&merged),
        church: format_church(&church_hits),
        preferences,
    })
}

async fn church_context(state: &AppState, org_id: Uuid) -> Result<Vec<MemoryHit>, anyhow::Error> {
    let church_vector = state
        .embeddings
        .embed(CONTEXT_QUERY, CHURCH_EMBEDDING_DIM)
        .await?;
    let mut hits = state
        .church_memory
        .search_church(
            org_id,
            church_vector,
            CHURCH_CONTEXT_LIMIT as u64,
            SIMILARITY_THRESHOLD,
        )
        .await?;
    hits.truncate(CHURCH_CONTEXT_LIMIT);
    Ok(hits)
}

fn recent_member_memories(
    conn: &mut PgConnection,
    org_id: Uuid,
    person_id: Uuid,
) -> Result<Vec<MemoryHit>, diesel::result::Error> {
    let rows: Vec<MemberMemory> = mm::member_memories
        .filter(mm::org_id.eq(org_id))
        .filter(mm::person_id.eq(person_id))
        .order(mm::created_at.desc())
        .limit(RECENT_MEMORY_LIMIT)
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|row| MemoryHit {
            id: Some(row.id),
            content: row.content,
            category: row.category,
            score: 0.0,
        })
        .collect())
}

fn preference_lines(
    conn: &mut PgConnection,
    org_id: Uuid,
    person_id: Uuid,
) -> Result<Vec<String>, diesel::result::Error> {
    let rows: Vec<MemberMemory> = mm::member_memories
        .filter(mm::org_id.eq(org_id))
        .filter(mm::person_id.eq(person_id))
        .filter(mm::category.eq(MEMORY_CATEGORY_PREFERENCE))
        .order(mm::created_at.desc())
        .limit(PREFERENCE_LIMIT)
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|row| format!("- {}", row.content))
        .collect())
}

/// Merges similarity hits with recency hits, deduplicated by record id.
/// First occurrence wins, so similarity-ranked records keep their slot
/// when the same record also shows up by recency.
pub fn merge_hits(
    vector_hits: Vec<MemoryHit>,
    recent_hits: Vec<MemoryHit>,
    cap: usize,
) -> Vec<MemoryHit> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut merged = Vec::new();
    for hit in vector_hits.into_iter().chain(recent_hits) {
        if let Some(id) = hit.id {
            if !seen.insert(id) {
                continue;
            }
        }
        merged.push(hit);
        if merged.len() == cap {
            break;
        }
    }
    merged
}

pub fn label_for_category(category: &str) -> &'static str {
    match category {
        MEMORY_CATEGORY_CALL_SUMMARY => "Previous call",
        MEMORY_CATEGORY_PRAYER_REQUEST => "Prayer request",
        MEMORY_CATEGORY_PERSONAL_NOTE => "Note",
        _ => "Info",
    }
}

fn format_personal(hits: &[MemoryHit]) -> Vec<String> {
    hits.iter()
        .map(|hit| format!("- {}: {}", label_for_category(&hit.category), hit.content))
        .collect()
}

fn format_church(hits: &[MemoryHit]) -> Vec<String> {
    hits.iter()
        .map(|hit| {
            let category = if hit.category.is_empty() {
                "general"
            } else {
                hit.category.as_str()
            };
            format!("- [{}] {}", category, hit.content)
        })
        .collect()
}

/// Appends the retrieved context sections to a rendered script. Empty
/// sections are omitted entirely; an empty context leaves the script
/// untouched apart from the length cap.
pub fn augment_prompt(base: &str, context: &CallContext) -> String {
    let mut prompt = base.to_string();
    if !context.is_empty() {
        if !context.personal.is_empty() {
            prompt.push_str("\n\n## Previous Conversations\n");
            prompt.push_str(&context.personal.join("\n"));
        }
        if !context.church.is_empty() {
            prompt.push_str("\n\n## Current Church Context\n");
            prompt.push_str(&context.church.join("\n"));
        }
        if !context.preferences.is_empty() {
            prompt.push_str("\n\n## Known Preferences\n");
            prompt.push_str(&context.preferences.join("\n"));
        }
        prompt.push_str(STEERING_GUIDANCE);
    }
    truncate_prompt(prompt)
}

fn truncate_prompt(prompt: String) -> String {
    if prompt.chars().count() <= MAX_PROMPT_CHARS {
        return prompt;
    }
    let keep = MAX_PROMPT_CHARS - TRUNCATION_MARKER.chars().count();
    let mut truncated: String = prompt.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
