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

//! The Evidence Shipper's pluggable backend contract: a small async trait
//! with one concrete implementation per storage type.

pub mod document_search;
pub mod log_search;
pub mod mock;
pub mod object_store;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use biaslens_core::ids::{new_id, sanitize_reference_component};

use crate::error::EvidenceCollectorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceData {
    pub evaluation_run_id: String,
    pub test_case_id: String,
    pub iteration: u32,
    pub timestamp_us: u64,
    pub prompt: String,
    pub output: String,
    pub reference_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub reference_id: String,
    pub storage_location: String,
    pub storage_type: &'static str,
}

/// Reference-ID grammar:
/// `evaluation-run-{runId}[-test-case-{id}][-iteration-{n}]-{uuid}`.
pub fn generate_reference_id(run_id: &str, test_case_id: Option<&str>, iteration: Option<u32>) -> String {
    let mut out = format!("evaluation-run-{run_id}");
    if let Some(id) = test_case_id {
        out.push_str(&format!("-test-case-{}", sanitize_reference_component(id)));
    }
    if let Some(n) = iteration {
        out.push_str(&format!("-iteration-{n}"));
    }
    out.push('-');
    out.push_str(&new_id());
    out
}

/// The run-level reference, `evaluation-run-{uuid}`.
pub fn generate_run_reference_id() -> String {
    format!("evaluation-run-{}", new_id())
}

#[async_trait]
pub trait EvidenceBackend: Send + Sync {
    fn storage_type(&self) -> &'static str;

    /// Idempotent by reference ID where the backend supports it.
    async fn store_evidence(&self, data: &EvidenceData) -> Result<ReferenceInfo, EvidenceCollectorError>;

    /// Validates auth and resource existence; create-on-first-write is
    /// acceptable for a missing index/bucket, but a cluster/host-level
    /// "not found" is fatal non-retryable.
    async fn test_connection(&self) -> Result<bool, EvidenceCollectorError>;

    /// Batch size this backend ships per round.
    fn batch_size(&self) -> usize {
        20
    }
}

/// Retry policy: `delay = min(base * 2^attempt + rand(0,1000ms), cap)`,
/// base 1s, cap 30s, 3 retries by default (4 total attempts). A
/// `retryAfter` on the error overrides the computed backoff for the next
/// attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);
const CAP_DELAY: Duration = Duration::from_secs(30);

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX).max(1));
    let jitter_ms = rand::thread_rng().gen_range(0..1000);
    (exp + Duration::from_millis(jitter_ms)).min(CAP_DELAY)
}

/// Ships one item with retry, honoring rate-limit-aware backoff. Returns
/// the last error once retries are exhausted.
pub async fn store_with_retry(
    backend: &dyn EvidenceBackend,
    data: &EvidenceData,
    max_retries: u32,
) -> Result<ReferenceInfo, EvidenceCollectorError> {
    let mut attempt = 0u32;
    loop {
        match backend.store_evidence(data).await {
            Ok(info) => return Ok(info),
            Err(err) if !err.is_retryable || attempt >= max_retries => return Err(err),
            Err(err) => {
                let delay = err
                    .rate_limit_info
                    .as_ref()
                    .and_then(|info| info.retry_after)
                    .map(|d| d.min(CAP_DELAY))
                    .unwrap_or_else(|| backoff_delay(attempt));
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    category = ?err.category,
                    "evidence backend write failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_id_matches_iteration_grammar() {
        let rid = generate_reference_id("run-1", Some("case one"), Some(3));
        assert!(rid.starts_with("evaluation-run-run-1-test-case-case-one-iteration-3-"));
    }

    #[test]
    fn run_reference_id_matches_grammar() {
        let rid = generate_run_reference_id();
        assert!(rid.starts_with("evaluation-run-"));
    }

    #[test]
    fn backoff_never_exceeds_cap() {
        for attempt in 0..10 {
            assert!(backoff_delay(attempt) <= CAP_DELAY);
        }
    }
}
