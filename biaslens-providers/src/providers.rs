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

//! HTTP-backed model clients, one struct per provider: build a JSON body
//! by hand, POST with `reqwest`, pull fields out of the raw response
//! `serde_json::Value`.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use crate::client::{ChatMessage, ChatParameters, ModelClient, ModelResponse};
use crate::error::ProviderError;

fn messages_json(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect()
}

pub struct OpenAiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<ModelResponse, ProviderError> {
        let start = Instant::now();
        let mut body = json!({
            "model": self.model,
            "messages": messages_json(&messages),
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        if let Some(seed) = params.seed {
            body["seed"] = json!(seed);
        }
        if let Some(top_p) = params.top_p {
            body["top_p"] = json!(top_p);
        }

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let value: serde_json::Value = response.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Ok(ModelResponse {
            content,
            provider: "openai".to_string(),
            model: self.model.clone(),
            duration_ms: start.elapsed().as_millis() as u32,
        })
    }

    fn provider_id(&self) -> &str {
        "openai"
    }
}

pub struct AnthropicClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<ModelResponse, ProviderError> {
        let start = Instant::now();
        let body = json!({
            "model": self.model,
            "messages": messages_json(&messages),
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        let response = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let value: serde_json::Value = response.json().await?;
        let content = value["content"][0]["text"].as_str().unwrap_or("").to_string();

        Ok(ModelResponse {
            content,
            provider: "anthropic".to_string(),
            model: self.model.clone(),
            duration_ms: start.elapsed().as_millis() as u32,
        })
    }

    fn provider_id(&self) -> &str {
        "anthropic"
    }
}

pub struct DeepSeekClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl DeepSeekClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelClient for DeepSeekClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<ModelResponse, ProviderError> {
        let start = Instant::now();
        let body = json!({
            "model": self.model,
            "messages": messages_json(&messages),
            "temperature": params.temperature,
        });

        let response = self
            .http
            .post("https://api.deepseek.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let value: serde_json::Value = response.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Ok(ModelResponse {
            content,
            provider: "deepseek".to_string(),
            model: self.model.clone(),
            duration_ms: start.elapsed().as_millis() as u32,
        })
    }

    fn provider_id(&self) -> &str {
        "deepseek"
    }
}

pub struct OllamaClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<ModelResponse, ProviderError> {
        let start = Instant::now();
        let mut body = json!({
            "model": self.model,
            "messages": messages_json(&messages),
            "options": {"temperature": params.temperature},
            "stream": false,
        });
        if let Some(seed) = params.seed {
            body["options"]["seed"] = json!(seed);
        }

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let value: serde_json::Value = response.json().await?;
        let content = value["message"]["content"].as_str().unwrap_or("").to_string();

        Ok(ModelResponse {
            content,
            provider: "ollama".to_string(),
            model: self.model.clone(),
            duration_ms: start.elapsed().as_millis() as u32,
        })
    }

    fn provider_id(&self) -> &str {
        "ollama"
    }
}
