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

use thiserror::Error;

use biaslens_scheduler::RetryableError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("determinism refused: provider {provider} has no seed support and fallback is disabled")]
    DeterminismRefused { provider: String },

    #[error("request to provider {provider} failed: {message}")]
    RequestFailed { provider: String, message: String },

    #[error("provider {provider} returned rate-limited status, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Lets the scheduler decide whether a provider failure should trigger its
/// 429 backoff path.
impl RetryableError for ProviderError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms, .. } => Some(retry_after_ms / 1000),
            _ => None,
        }
    }
}
