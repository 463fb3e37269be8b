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

//! Server configuration: a TOML file layered with environment overrides,
//! the shape and loading order mirroring `agentreplay-server::config::ServerConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub model_defaults: ModelDefaults,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            secrets: SecretsConfig::default(),
            model_defaults: ModelDefaults::default(),
            llm: LlmConfig::default(),
            evidence: EvidenceConfig::default(),
        }
    }
}

/// Which evidence-collection-config row to look up for a team, since
/// `EvidenceConfigStore::get` is keyed by `(team_id, storage_type)` and a
/// team may have multiple backends on file. Absent a default, evidence
/// collection is skipped entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceConfig {
    pub default_storage_type: Option<String>,
}

/// Per-provider credentials, modeled on `agentreplay-server::config::LLMConfig`.
/// `EvaluationRequest.llm_config_id` names one of these providers directly —
/// this workspace has no customer-scoped LLM-config database table, so the
/// in-memory reference deployment resolves credentials from the process
/// environment instead (see `DESIGN.md`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub ollama_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_cors: default_enable_cors(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:4600".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_auth_enabled(),
            bearer_tokens: Vec::new(),
        }
    }
}

fn default_auth_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_requests: default_rate_limit_max_requests(),
            window_secs: default_rate_limit_window_secs(),
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}
fn default_rate_limit_max_requests() -> u32 {
    100
}
fn default_rate_limit_window_secs() -> u64 {
    60
}

/// Env-sourced secrets, read once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    pub api_key_encryption_secret: Option<String>,
    pub signing_key_encryption_secret: Option<String>,
    pub repro_pack_signing_private_key: Option<String>,
    pub repro_pack_signing_public_key: Option<String>,
    pub repro_pack_signing_key_id: Option<String>,
    pub repro_pack_signing_authority: Option<String>,
}

/// Default model selection and decoding parameters applied when a request
/// omits `llmConfigId`, sourced from `EVALUATION_MODEL_*` env vars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefaults {
    #[serde(default = "default_model_provider")]
    pub provider: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub seed: Option<i64>,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            model_name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
            top_k: None,
            seed: None,
        }
    }
}

fn default_model_provider() -> String {
    "simulated".to_string()
}
fn default_model_name() -> String {
    "simulated-v1".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Layers environment overrides atop the config-file values, the way
    /// `agentreplay-server::config::ServerConfig::merge_with_env` does: env
    /// only overrides fields whose variable was explicitly set.
    pub fn from_env(mut self) -> Self {
        if let Ok(addr) = std::env::var("BIASLENS_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(v) = std::env::var("BIASLENS_AUTH_ENABLED") {
            self.auth.enabled = v.parse().unwrap_or(self.auth.enabled);
        }
        if let Ok(tokens) = std::env::var("BIASLENS_BEARER_TOKENS") {
            self.auth.bearer_tokens = tokens.split(',').map(|s| s.trim().to_string()).collect();
        }

        self.secrets.api_key_encryption_secret =
            std::env::var("API_KEY_ENCRYPTION_SECRET").ok().or(self.secrets.api_key_encryption_secret);
        self.secrets.signing_key_encryption_secret = std::env::var("SIGNING_KEY_ENCRYPTION_SECRET")
            .ok()
            .or(self.secrets.signing_key_encryption_secret);
        self.secrets.repro_pack_signing_private_key = std::env::var("REPRO_PACK_SIGNING_PRIVATE_KEY")
            .ok()
            .or(self.secrets.repro_pack_signing_private_key);
        self.secrets.repro_pack_signing_public_key = std::env::var("REPRO_PACK_SIGNING_PUBLIC_KEY")
            .ok()
            .or(self.secrets.repro_pack_signing_public_key);
        self.secrets.repro_pack_signing_key_id =
            std::env::var("REPRO_PACK_SIGNING_KEY_ID").ok().or(self.secrets.repro_pack_signing_key_id);
        self.secrets.repro_pack_signing_authority = std::env::var("REPRO_PACK_SIGNING_AUTHORITY")
            .ok()
            .or(self.secrets.repro_pack_signing_authority);

        if let Ok(v) = std::env::var("EVALUATION_MODEL_PROVIDER") {
            self.model_defaults.provider = v;
        }
        if let Ok(v) = std::env::var("EVALUATION_MODEL_NAME") {
            self.model_defaults.model_name = v;
        }
        if let Ok(v) = std::env::var("EVALUATION_TEMPERATURE") {
            if let Ok(parsed) = v.parse() {
                self.model_defaults.temperature = parsed;
            }
        }
        if let Ok(v) = std::env::var("EVALUATION_MAX_TOKENS") {
            if let Ok(parsed) = v.parse() {
                self.model_defaults.max_tokens = parsed;
            }
        }
        if let Ok(v) = std::env::var("EVALUATION_TOP_P") {
            self.model_defaults.top_p = v.parse().ok();
        }
        if let Ok(v) = std::env::var("EVALUATION_TOP_K") {
            self.model_defaults.top_k = v.parse().ok();
        }
        if let Ok(v) = std::env::var("EVALUATION_SEED") {
            self.model_defaults.seed = v.parse().ok();
        }

        self.llm.openai_api_key = std::env::var("OPENAI_API_KEY").ok().or(self.llm.openai_api_key);
        self.llm.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok().or(self.llm.anthropic_api_key);
        self.llm.deepseek_api_key = std::env::var("DEEPSEEK_API_KEY").ok().or(self.llm.deepseek_api_key);
        self.llm.ollama_base_url = std::env::var("OLLAMA_BASE_URL").ok().or(self.llm.ollama_base_url);

        self
    }

    /// File-if-present-else-default, then environment overrides — matching
    /// `agentreplay-server::config::ServerConfig::load`.
    pub fn load(config_file: Option<PathBuf>) -> anyhow::Result<Self> {
        let base = match config_file {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        Ok(base.from_env())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.socket_addr()?;
        if self.auth.enabled && self.auth.bearer_tokens.is_empty() {
            anyhow::bail!("auth.enabled is true but no bearer tokens are configured");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_listen_addr() {
        let config = ServerConfig::default();
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn env_overrides_win_over_file_defaults() {
        std::env::set_var("EVALUATION_MODEL_PROVIDER", "anthropic");
        let config = ServerConfig::default().from_env();
        assert_eq!(config.model_defaults.provider, "anthropic");
        std::env::remove_var("EVALUATION_MODEL_PROVIDER");
    }
}
