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

//! Elasticsearch/OpenSearch-style document-search evidence backend.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;

use crate::error::EvidenceCollectorError;

use super::{EvidenceBackend, EvidenceData, ReferenceInfo};

pub enum DocumentSearchAuth {
    ApiKey(String),
    Basic { username: String, password: String },
}

impl DocumentSearchAuth {
    fn header_value(&self) -> String {
        match self {
            DocumentSearchAuth::ApiKey(key) => format!("ApiKey {key}"),
            DocumentSearchAuth::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        }
    }
}

#[derive(Deserialize)]
struct ClusterHealthBody {
    status: String,
}

pub struct DocumentSearchBackend {
    client: Client,
    endpoint: String,
    index: String,
    auth: DocumentSearchAuth,
}

impl DocumentSearchBackend {
    pub fn new(endpoint: impl Into<String>, index: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_auth(endpoint, DocumentSearchAuth::ApiKey(api_key.into()), index)
    }

    pub fn with_basic_auth(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self::with_auth(
            endpoint,
            DocumentSearchAuth::Basic {
                username: username.into(),
                password: password.into(),
            },
            index,
        )
    }

    pub fn with_auth(endpoint: impl Into<String>, auth: DocumentSearchAuth, index: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            index: index.into(),
            auth,
        }
    }
}

#[async_trait]
impl EvidenceBackend for DocumentSearchBackend {
    fn storage_type(&self) -> &'static str {
        "document_search"
    }

    fn batch_size(&self) -> usize {
        20
    }

    async fn store_evidence(&self, data: &EvidenceData) -> Result<ReferenceInfo, EvidenceCollectorError> {
        let url = format!("{}/{}/_doc/{}", self.endpoint, self.index, data.reference_id);

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth.header_value())
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
            storage_location: url,
            storage_type: self.storage_type(),
        })
    }

    async fn test_connection(&self) -> Result<bool, EvidenceCollectorError> {
        let health_url = format!("{}/_cluster/health", self.endpoint);
        let response = self
            .client
            .get(&health_url)
            .header("Authorization", self.auth.header_value())
            .send()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

        if !response.status().is_success() {
            return Err(EvidenceCollectorError::new(Some(response.status().as_u16()), "cluster health check failed"));
        }

        // HTTP 200 doesn't mean healthy: ES/OpenSearch report cluster status
        // ("green"/"yellow"/"red") in the response body regardless of status
        // code, so a red cluster has to be read out of the body.
        let body: ClusterHealthBody = response
            .json()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("malformed cluster health response: {e}")))?;

        if body.status.eq_ignore_ascii_case("red") {
            return Err(EvidenceCollectorError::new(None, "cluster health is red"));
        }

        let index_url = format!("{}/{}", self.endpoint, self.index);
        let index_check = self
            .client
            .head(&index_url)
            .header("Authorization", self.auth.header_value())
            .send()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

        // A missing index is recoverable: indexes are created on first write.
        match index_check.status().as_u16() {
            200 | 404 => Ok(true),
            status => Err(EvidenceCollectorError::new(Some(status), "index existence check failed")),
        }
    }
}
