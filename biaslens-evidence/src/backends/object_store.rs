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

//! S3-compatible object-store evidence backend.

use async_trait::async_trait;
use reqwest::Client;

use biaslens_core::ids::sanitize_reference_component;

use crate::error::EvidenceCollectorError;

use super::{EvidenceBackend, EvidenceData, ReferenceInfo};

pub struct ObjectStoreBackend {
    client: Client,
    endpoint: String,
    bucket: String,
    access_key: String,
    secret_key: String,
}

impl ObjectStoreBackend {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Key layout: `evidence/{sanitizedRunId}/{sanitizedTestCaseId}/{iteration}-{sanitizedRefId}.json`.
    fn object_key(&self, data: &EvidenceData) -> String {
        format!(
            "evidence/{}/{}/{}-{}.json",
            sanitize_reference_component(&data.evaluation_run_id),
            sanitize_reference_component(&data.test_case_id),
            data.iteration,
            sanitize_reference_component(&data.reference_id),
        )
    }
}

#[async_trait]
impl EvidenceBackend for ObjectStoreBackend {
    fn storage_type(&self) -> &'static str {
        "object_store"
    }

    fn batch_size(&self) -> usize {
        25
    }

    async fn store_evidence(&self, data: &EvidenceData) -> Result<ReferenceInfo, EvidenceCollectorError> {
        let key = self.object_key(data);
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);
        let body = serde_json::to_vec(data)
            .map_err(|e| EvidenceCollectorError::new(None, format!("failed to serialize evidence: {e}")))?;

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header("Content-Type", "application/json")
            .header("x-amz-meta-evaluation-run-id", &data.evaluation_run_id)
            .header("x-amz-meta-test-case-id", &data.test_case_id)
            .header("x-amz-meta-iteration", data.iteration.to_string())
            .header("x-amz-meta-reference-id", &data.reference_id)
            .body(body)
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
        let url = format!("{}/{}", self.endpoint, self.bucket);
        let response = self
            .client
            .head(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .send()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

        // A missing bucket is recoverable (created lazily on first write);
        // only auth/permission failures are fatal here.
        match response.status().as_u16() {
            200 | 404 => {}
            status => return Err(EvidenceCollectorError::new(Some(status), "object store connection check failed")),
        }

        // The HEAD only proves the bucket is reachable; confirm the
        // credentials actually have write access with a small test object.
        let probe_url = format!("{}/{}/evidence/.connection-check", self.endpoint, self.bucket);
        let probe = self
            .client
            .put(&probe_url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header("Content-Type", "application/octet-stream")
            .body(Vec::from(b"ok".as_slice()))
            .send()
            .await
            .map_err(|e| EvidenceCollectorError::new(None, format!("network error: {e}")))?;

        if !probe.status().is_success() {
            return Err(EvidenceCollectorError::new(
                Some(probe.status().as_u16()),
                "object store test write failed",
            ));
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{basic_auth, header, method, path};
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

    const EXPECTED_KEY: &str = "/my-bucket/evidence/run-1/case-1/0-evaluation-run-run-1-test-case-case-1-iteration-0-uuid.json";

    #[tokio::test]
    async fn stores_evidence_under_the_expected_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(EXPECTED_KEY))
            .and(basic_auth("access", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "my-bucket", "access", "secret");
        let info = backend.store_evidence(&sample_data()).await.unwrap();

        assert_eq!(info.storage_type, "object_store");
        assert!(info.storage_location.ends_with(".json"));
    }

    #[tokio::test]
    async fn object_metadata_mirrors_the_identifiers() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(EXPECTED_KEY))
            .and(header("x-amz-meta-evaluation-run-id", "run-1"))
            .and(header("x-amz-meta-test-case-id", "case-1"))
            .and(header("x-amz-meta-iteration", "0"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "my-bucket", "access", "secret");
        backend.store_evidence(&sample_data()).await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_non_success_status_as_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(EXPECTED_KEY))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "my-bucket", "access", "secret");
        let err = backend.store_evidence(&sample_data()).await.unwrap_err();

        assert_eq!(err.category, ErrorCategory::Permission);
        assert!(!err.is_retryable);
    }

    #[tokio::test]
    async fn treats_a_missing_bucket_as_a_recoverable_connection_check() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/missing-bucket"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/missing-bucket/evidence/.connection-check"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "missing-bucket", "access", "secret");
        assert!(backend.test_connection().await.unwrap());
    }

    #[tokio::test]
    async fn treats_an_auth_failure_on_connection_check_as_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/my-bucket"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "my-bucket", "access", "secret");
        assert!(backend.test_connection().await.is_err());
    }

    #[tokio::test]
    async fn treats_a_failed_test_write_as_a_fatal_connection_check() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/my-bucket"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/my-bucket/evidence/.connection-check"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "my-bucket", "access", "secret");
        assert!(backend.test_connection().await.is_err());
    }
}
