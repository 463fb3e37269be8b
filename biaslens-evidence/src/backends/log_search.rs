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

//! Log-search-style (Splunk HEC / similar) evidence backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::EvidenceCollectorError;

use super::{EvidenceBackend, EvidenceData, ReferenceInfo};

/// HEC collector port conventions vs. the management/REST API port.
const DEFAULT_COLLECTOR_PORT: u16 = 8088;
const DEFAULT_MANAGEMENT_PORT: u16 = 8089;

pub enum LogSearchAuth {
    /// `Authorization: Splunk {token}` straight to the HEC receiver.
    Token(String),
    /// Session login against the management endpoint, then POST to the
    /// simple receiver with the returned session key.
    Basic { username: String, password: String },
}

pub struct LogSearchBackend {
    client: Client,
    endpoint: String,
    auth: LogSearchAuth,
    index: String,
}

impl LogSearchBackend {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, index: impl Into<String>) -> Self {
        Self::with_auth(endpoint, LogSearchAuth::Token(token.into()), index)
    }

    pub fn with_basic_auth(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self::with_auth(
            endpoint,
            LogSearchAuth::Basic {
                username: username.into(),
                password: password.into(),
            },
            index,
        )
    }

    pub fn with_auth(endpoint: impl Into<String>, auth: LogSearchAuth, index: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            auth,
            index: index.into(),
        }
    }

    /// Applies the given port convention when the configured endpoint
    /// didn't already pin one down, leaving scheme, host, and an explicit
    /// port untouched. Falls back to the raw endpoint if it doesn't parse
    /// as a URL.
    fn endpoint_with_port(&self, default_port: u16) -> String {
        match url::Url::parse(&self.endpoint) {
            Ok(mut parsed) => {
                if parsed.port().is_none() {
                    let _ = parsed.set_port(Some(default_port));
                }
                parsed.to_string().trim_end_matches('/').to_string()
            }
            Err(_) => self.endpoint.clone(),
        }
    }

    fn collector_endpoint(&self) -> String {
        self.endpoint_with_port(DEFAULT_COLLECTOR_PORT)
    }

    fn management_endpoint(&self) -> String {
        self.endpoint_with_port(DEFAULT_MANAGEMENT_PORT)
    }

    async fn session_login(&self, username: &str, password: &str) -> Result<String, EvidenceCollectorError> {
        let url = format!("{}/services/auth/login", self.management_endpoint());
        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password), ("output_mode", "json")])
            .send()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EvidenceCollectorError::new(Some(status.as_u16()), message));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("malformed session login response: {e}")))?;

        body.get("sessionKey")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| EvidenceCollectorError::new(None, "session login response missing sessionKey"))
    }
}

#[async_trait]
impl EvidenceBackend for LogSearchBackend {
    fn storage_type(&self) -> &'static str {
        "log_search"
    }

    fn batch_size(&self) -> usize {
        15
    }

    async fn store_evidence(&self, data: &EvidenceData) -> Result<ReferenceInfo, EvidenceCollectorError> {
        match &self.auth {
            LogSearchAuth::Token(token) => {
                let url = format!("{}/services/collector/event", self.collector_endpoint());
                let event = json!({
                    "event": data,
                    "index": self.index,
                    "sourcetype": "biaslens:evidence",
                });

                let response = self
                    .client
                    .post(&url)
                    .header("Authorization", format!("Splunk {token}"))
                    .json(&event)
                    .send()
                    .await
                    .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(EvidenceCollectorError::new(Some(status.as_u16()), message));
                }

                Ok(ReferenceInfo {
                    reference_id: data.reference_id.clone(),
                    storage_location: format!("{}?index={}", url, self.index),
                    storage_type: self.storage_type(),
                })
            }
            LogSearchAuth::Basic { username, password } => {
                let session_key = self.session_login(username, password).await?;
                let url = format!("{}/services/receivers/simple", self.collector_endpoint());

                let response = self
                    .client
                    .post(&url)
                    .header("Authorization", format!("Splunk {session_key}"))
                    .query(&[("index", self.index.as_str()), ("sourcetype", "biaslens:evidence")])
                    .json(data)
                    .send()
                    .await
                    .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(EvidenceCollectorError::new(Some(status.as_u16()), message));
                }

                Ok(ReferenceInfo {
                    reference_id: data.reference_id.clone(),
                    storage_location: format!("{}?index={}", url, self.index),
                    storage_type: self.storage_type(),
                })
            }
        }
    }

    async fn test_connection(&self) -> Result<bool, EvidenceCollectorError> {
        match &self.auth {
            LogSearchAuth::Token(token) => {
                let url = format!("{}/services/collector/health", self.collector_endpoint());
                let response = self
                    .client
                    .get(&url)
                    .header("Authorization", format!("Splunk {token}"))
                    .send()
                    .await
                    .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

                if response.status().is_success() {
                    Ok(true)
                } else {
                    Err(EvidenceCollectorError::new(Some(response.status().as_u16()), "log search health check failed"))
                }
            }
            LogSearchAuth::Basic { username, password } => {
                // A successful session login is itself the health signal:
                // it proves the management endpoint and credentials work.
                self.session_login(username, password).await.map(|_| true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ErrorCategory;

    fn sample_data() -> EvidenceData {
        EvidenceData {
            evaluation_run_id: "run-1".into(),
            test_case_id: "case-1".into(),
            iteration: 0,
            timestamp_us: 0,
            prompt: "prompt".into(),
            output: "output".into(),
            reference_id: "evaluation-run-run-1-test-case-case-1-iteration-0-uuid".into(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn posts_an_hec_event_with_the_splunk_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/collector/event"))
            .and(header("Authorization", "Splunk hec-token"))
            .and(body_partial_json(json!({"index": "biaslens"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = LogSearchBackend::new(server.uri(), "hec-token", "biaslens");
        let info = backend.store_evidence(&sample_data()).await.unwrap();

        assert_eq!(info.storage_type, "log_search");
    }

    #[tokio::test]
    async fn classifies_a_429_as_retryable_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/collector/event"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let backend = LogSearchBackend::new(server.uri(), "hec-token", "biaslens");
        let err = backend.store_evidence(&sample_data()).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert!(err.is_retryable);
    }

    #[tokio::test]
    async fn reports_connection_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/collector/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = LogSearchBackend::new(server.uri(), "hec-token", "biaslens");
        assert!(backend.test_connection().await.unwrap());
    }

    #[tokio::test]
    async fn basic_auth_logs_in_then_posts_to_the_simple_receiver() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionKey": "sess-123"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/services/receivers/simple"))
            .and(header("Authorization", "Splunk sess-123"))
            .and(query_param("index", "biaslens"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = LogSearchBackend::with_basic_auth(server.uri(), "admin", "changeme", "biaslens");
        let info = backend.store_evidence(&sample_data()).await.unwrap();

        assert_eq!(info.storage_type, "log_search");
    }

    #[tokio::test]
    async fn basic_auth_surfaces_a_failed_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let backend = LogSearchBackend::with_basic_auth(server.uri(), "admin", "wrong", "biaslens");
        let err = backend.store_evidence(&sample_data()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Authentication);
    }
}
