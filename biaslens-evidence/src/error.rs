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

//! Error classification for evidence backends.

use std::time::Duration;

use thiserror::Error;

/// Rate-limit hints extracted from standard HTTP headers
/// (`Retry-After`, `X-RateLimit-Remaining`, `X-RateLimit-Reset`).
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    pub retry_after: Option<Duration>,
    pub remaining: Option<u64>,
    pub reset_at_unix_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    RateLimit,
    Authentication,
    Permission,
    NotFound,
    Validation,
    ServerError,
    Unknown,
}

impl ErrorCategory {
    /// Default retryability per category. `NotFound` is "sometimes" in
    /// practice (a recoverable missing index vs. a fatal cluster/host
    /// not-found); callers that hit the recoverable branch construct the
    /// error with `is_retryable` overridden rather than relying on this
    /// default.
    pub fn default_retryable(&self) -> bool {
        match self {
            ErrorCategory::Network => true,
            ErrorCategory::RateLimit => true,
            ErrorCategory::Authentication => false,
            ErrorCategory::Permission => false,
            ErrorCategory::NotFound => false,
            ErrorCategory::Validation => false,
            ErrorCategory::ServerError => true,
            ErrorCategory::Unknown => true,
        }
    }

    /// Classifies an error from its HTTP status (if any) and message text.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let lower = message.to_lowercase();
        if let Some(status) = status {
            match status {
                401 => return ErrorCategory::Authentication,
                403 => return ErrorCategory::Permission,
                404 => return ErrorCategory::NotFound,
                400 => return ErrorCategory::Validation,
                429 => return ErrorCategory::RateLimit,
                500..=599 => return ErrorCategory::ServerError,
                _ => {}
            }
        }
        if lower.contains("econnrefused")
            || lower.contains("etimedout")
            || lower.contains("enotfound")
            || lower.contains("network error")
        {
            return ErrorCategory::Network;
        }
        if lower.contains("rate limit") || lower.contains("throttl") || lower.contains("quota") {
            return ErrorCategory::RateLimit;
        }
        if lower.contains("unauthorized") || lower.contains("invalid credentials") || lower.contains("invalid token") {
            return ErrorCategory::Authentication;
        }
        if lower.contains("forbidden") || lower.contains("access denied") {
            return ErrorCategory::Permission;
        }
        if lower.contains("bad request") || lower.contains("invalid") || lower.contains("malformed") {
            return ErrorCategory::Validation;
        }
        ErrorCategory::Unknown
    }
}

#[derive(Debug, Error)]
#[error("evidence backend error ({category:?}): {message}")]
pub struct EvidenceCollectorError {
    pub category: ErrorCategory,
    pub message: String,
    pub is_retryable: bool,
    pub rate_limit_info: Option<RateLimitInfo>,
}

impl EvidenceCollectorError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        let category = ErrorCategory::classify(status, &message);
        Self {
            is_retryable: category.default_retryable(),
            category,
            message,
            rate_limit_info: None,
        }
    }

    /// Overrides the classifier's default retryability, used for the
    /// "recoverable missing index" branch of `not_found`.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.is_retryable = retryable;
        self
    }

    pub fn with_rate_limit_info(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit_info = Some(info);
        self.category = ErrorCategory::RateLimit;
        self.is_retryable = true;
        self
    }

    pub fn is_rate_limited(&self) -> bool {
        self.category == ErrorCategory::RateLimit || self.rate_limit_info.is_some()
    }
}
