// Copyright 2026 BiasLens Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pluggable model client trait: a per-provider `LLMProvider`-style seam
//! scoped to the single-shot chat call a bias probe needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatParameters {
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_tokens: u32,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub duration_ms: u32,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<ModelResponse, ProviderError>;

    fn provider_id(&self) -> &str;
}

/// Deterministic stand-in backend used by tests and local development:
/// hashes the prompt content into a stable pseudo-response so repeated
/// calls with the same seed produce byte-identical output.
pub struct SimulatedModelClient {
    provider: String,
}

impl SimulatedModelClient {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

#[async_trait]
impl ModelClient for SimulatedModelClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<ModelResponse, ProviderError> {
        let seed = params.seed.unwrap_or(0);
        let prompt: String = messages.iter().map(|m| m.content.as_str()).collect();
        let content = format!(
            "[simulated:{}:seed={}] response to: {}",
            self.provider,
            seed,
            prompt.chars().take(120).collect::<String>()
        );
        Ok(ModelResponse {
            content,
            provider: self.provider.clone(),
            model: format!("{}-simulated", self.provider),
            duration_ms: 1,
        })
    }

    fn provider_id(&self) -> &str {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_client_is_deterministic_for_same_seed() {
        let client = SimulatedModelClient::new("openai");
        let messages = vec![ChatMessage {
            role: "user".into(),
            content: "describe the anchoring bias".into(),
        }];
        let params = ChatParameters {
            temperature: 0.0,
            top_p: None,
            top_k: None,
            max_tokens: 256,
            seed: Some(42),
        };
        let a = client.chat(messages.clone(), &params).await.unwrap();
        let b = client.chat(messages, &params).await.unwrap();
        assert_eq!(a.content, b.content);
    }
}
