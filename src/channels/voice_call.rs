use crate::config::VoiceConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Outbound AI-voice provider. One HTTP call per outreach attempt; the
/// provider rings the person, speaks `first_message`, then follows
/// `system_prompt` for the rest of the conversation.
pub struct VoiceCallClient {
    config: VoiceConfig,
    http_client: Client,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartCallRequest {
    pub phone_number: String,
    pub from_number_id: Option<String>,
    pub first_message: String,
    pub system_prompt: String,
    pub model: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboundCall {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceCallError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Voice provider error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VoiceCallClient {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    pub fn default_voice_id(&self) -> &str {
        &self.config.default_voice_id
    }

    pub fn default_from_number_id(&self) -> Option<String> {
        self.config.default_from_number_id.clone()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn start_call(&self, request: &StartCallRequest) -> Result<OutboundCall, VoiceCallError> {
        if self.config.api_key.is_empty() {
            return Err(VoiceCallError::Config("missing voice API key".to_string()));
        }

        let url = format!("{}/call", self.config.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| VoiceCallError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "no response body".to_string());
            return Err(VoiceCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<OutboundCall>()
            .await
            .map_err(|e| VoiceCallError::Parse(e.to_string()))
    }
}
