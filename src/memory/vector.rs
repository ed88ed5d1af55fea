use anyhow::Result;
use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{Condition, Filter, ScoredPoint, SearchPointsBuilder};
use qdrant_client::Qdrant;
use uuid::Uuid;

pub const MEMBER_COLLECTION: &str = "member_memories";
pub const CHURCH_COLLECTION: &str = "church_memories";

/// One retrieved memory record. `id` mirrors the relational row id so the
/// retriever can deduplicate vector hits against recency hits.
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub id: Option<Uuid>,
    pub content: String,
    pub category: String,
    pub score: f32,
}

/// Similarity search over one person's memories. Kept separate from
/// [`ChurchMemorySearch`]: the two collections use different vector
/// widths and payload schemas and are not interoperable.
#[async_trait]
pub trait MemberMemorySearch: Send + Sync {
    async fn search_member(
        &self,
        person_id: Uuid,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<MemoryHit>>;
}

/// Similarity search over organization-wide memories.
#[async_trait]
pub trait ChurchMemorySearch: Send + Sync {
    async fn search_church(
        &self,
        org_id: Uuid,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<MemoryHit>>;
}

pub struct QdrantMemoryIndex {
    client: Qdrant,
}

impl QdrantMemoryIndex {
    pub fn connect(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client })
    }

    async fn search(
        &self,
        collection: &str,
        scope_field: &str,
        scope_value: String,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<MemoryHit>> {
        let request = SearchPointsBuilder::new(collection, vector, limit)
            .filter(Filter::must([Condition::matches(scope_field, scope_value)]))
            .score_threshold(score_threshold)
            .with_payload(true);

        let response = self.client.search_points(request).await?;
        Ok(response.result.into_iter().map(hit_from_point).collect())
    }
}

#[async_trait]
impl MemberMemorySearch for QdrantMemoryIndex {
    async fn search_member(
        &self,
        person_id: Uuid,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<MemoryHit>> {
        self.search(
            MEMBER_COLLECTION,
            "person_id",
            person_id.to_string(),
            vector,
            limit,
            score_threshold,
        )
        .await
    }
}

#[async_trait]
impl ChurchMemorySearch for QdrantMemoryIndex {
    async fn search_church(
        &self,
        org_id: Uuid,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<MemoryHit>> {
        self.search(
            CHURCH_COLLECTION,
            "org_id",
            org_id.to_string(),
            vector,
            limit,
            score_threshold,
        )
        .await
    }
}

fn hit_from_point(point: ScoredPoint) -> MemoryHit {
    let id = point
        .id
        .and_then(|pid| pid.point_id_options)
        .and_then(|options| match options {
            PointIdOptions::Uuid(value) => Uuid::parse_str(&value).ok(),
            PointIdOptions::Num(_) => None,
        });
    let content = payload_str(&point.payload, "content").unwrap_or_default();
    let category =
        payload_str(&point.payload, "category").unwrap_or_else(|| "general".to_string());
    MemoryHit {
        id,
        content,
        category,
        score: point.score,
    }
}

fn payload_str(
    payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    key: &str,
) -> Option<String> {
    payload.get(key).and_then(|value| match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}
