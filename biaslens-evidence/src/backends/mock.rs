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

//! In-memory backend for tests: records everything shipped to it and can be
//! configured to fail a fixed number of times before succeeding, exercising
//! the shipper's retry path without a network dependency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EvidenceCollectorError, ErrorCategory, RateLimitInfo};

use super::{EvidenceBackend, EvidenceData, ReferenceInfo};

pub struct MockBackend {
    stored: Mutex<Vec<EvidenceData>>,
    failures_remaining: AtomicUsize,
    connection_ok: bool,
    always_rate_limited: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(0),
            connection_ok: true,
            always_rate_limited: false,
        }
    }

    pub fn failing_times(mut self, n: usize) -> Self {
        self.failures_remaining = AtomicUsize::new(n);
        self
    }

    pub fn with_connection_ok(mut self, ok: bool) -> Self {
        self.connection_ok = ok;
        self
    }

    /// Every `store_evidence` call returns a 429 with a one-second
    /// `Retry-After`, never recovering. Exercises the shipper's "stuck
    /// rate-limited backend" path without a real HTTP dependency.
    pub fn with_always_rate_limited(mut self, on: bool) -> Self {
        self.always_rate_limited = on;
        self
    }

    pub fn stored(&self) -> Vec<EvidenceData> {
        self.stored.lock().expect("mock backend lock poisoned").clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EvidenceBackend for MockBackend {
    fn storage_type(&self) -> &'static str {
        "mock"
    }

    async fn store_evidence(&self, data: &EvidenceData) -> Result<ReferenceInfo, EvidenceCollectorError> {
        if self.always_rate_limited {
            return Err(EvidenceCollectorError::new(Some(429), "simulated rate limit")
                .with_rate_limit_info(RateLimitInfo {
                    retry_after: Some(std::time::Duration::from_secs(2)),
                    remaining: Some(0),
                    reset_at_unix_secs: None,
                }));
        }

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(EvidenceCollectorError::new(Some(503), "simulated transient failure")
                .with_retryable(ErrorCategory::ServerError.default_retryable()));
        }

        self.stored.lock().expect("mock backend lock poisoned").push(data.clone());
        Ok(ReferenceInfo {
            reference_id: data.reference_id.clone(),
            storage_location: format!("mock://{}", data.reference_id),
            storage_type: self.storage_type(),
        })
    }

    async fn test_connection(&self) -> Result<bool, EvidenceCollectorError> {
        if self.connection_ok {
            Ok(true)
        } else {
            Err(EvidenceCollectorError::new(Some(401), "simulated auth failure"))
        }
    }
}
