use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub voice: VoiceConfig,
    pub embedding: EmbeddingConfig,
    pub qdrant_url: String,
    pub outreach_tick_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_from_number_id: Option<String>,
    pub model: String,
    pub default_voice_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server = ServerConfig {
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        };
        let voice = VoiceConfig {
            api_key: std::env::var("VOICE_API_KEY").unwrap_or_default(),
            base_url: std::env::var("VOICE_BASE_URL")
                .unwrap_or_else(|_| "https://api.voice-provider.com".to_string()),
            default_from_number_id: std::env::var("VOICE_DEFAULT_NUMBER_ID").ok(),
            model: std::env::var("VOICE_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            default_voice_id: std::env::var("VOICE_DEFAULT_VOICE_ID")
                .unwrap_or_else(|_| "alloy".to_string()),
        };
        let embedding = EmbeddingConfig {
            api_key: std::env::var("EMBEDDING_API_KEY").unwrap_or_default(),
            base_url: std::env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
        };
        Ok(AppConfig {
            server,
            voice,
            embedding,
            qdrant_url: std::env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6334".to_string()),
            outreach_tick_secs: std::env::var("OUTREACH_TICK_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        })
    }
}
