use crate::channels::voice_call::VoiceCallClient;
use crate::config::AppConfig;
use crate::memory::embeddings::EmbeddingProvider;
use crate::memory::vector::{ChurchMemorySearch, MemberMemorySearch};
use crate::shared::utils::DbPool;
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub conn: DbPool,
    pub voice: Arc<VoiceCallClient>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub member_memory: Arc<dyn MemberMemorySearch>,
    pub church_memory: Arc<dyn ChurchMemorySearch>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            conn: self.conn.clone(),
            voice: Arc::clone(&self.voice),
            embeddings: Arc::clone(&self.embeddings),
            member_memory: Arc::clone(&self.member_memory),
            church_memory: Arc::clone(&self.church_memory),
        }
    }
}
