use crate::config::EmbeddingConfig;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text` into a vector of exactly `dimensions` components.
    async fn embed(&self, text: &str, dimensions: u32) -> Result<Vec<f32>>;
}

pub struct EmbeddingClient {
    config: EmbeddingConfig,
    http_client: reqwest::Client,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str, dimensions: u32) -> Result<Vec<f32>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))?,
        );

        let body = json!({
            "input": text,
            "model": self.config.model,
            "dimensions": dimensions,
        });

        let url = format!("{}/v1/embeddings", self.config.base_url);
        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Embedding API error: {}",
                response.status()
            ));
        }

        let result: serde_json::Value = response.json().await?;
        let embedding: Vec<f32> = result["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid embedding response format"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        if embedding.len() != dimensions as usize {
            return Err(anyhow::anyhow!(
                "Embedding width mismatch: requested {}, got {}",
                dimensions,
                embedding.len()
            ));
        }

        Ok(embedding)
    }
}
