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

//! # BiasLens Scheduler
//!
//! Per-provider rate-limited call scheduler, built on a token-bucket /
//! `AtomicU64` pattern turned around to pace outbound provider calls: one
//! scheduler instance per provider, last-call timestamp tracked lock-free,
//! calls serialized within a provider and independent across providers.

pub mod error;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::sleep;

pub use error::SchedulerError;

/// Retry policy for a single provider.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerPolicy {
    pub requests_per_minute: u32,
    pub min_interval_ms: u64,
    pub retry_after_ms: u64,
}

impl SchedulerPolicy {
    fn interval_ms(&self) -> u64 {
        let rpm_interval = 60_000 / self.requests_per_minute.max(1) as u64;
        self.min_interval_ms.max(rpm_interval)
    }
}

/// Emitted before a sleep longer than zero is taken, so a caller can fold
/// the wait into progress reporting.
#[derive(Debug, Clone)]
pub struct ThrottleEvent {
    pub delay_ms: u64,
    pub eta_ms: u64,
    pub remaining_iterations: u32,
    pub policy: SchedulerPolicy,
}

/// An error a scheduled task can return that carries enough information to
/// decide whether it should be retried as a rate-limit backoff.
pub trait RetryableError: std::error::Error {
    fn is_rate_limited(&self) -> bool;
    fn retry_after_secs(&self) -> Option<u64>;
}

const MAX_RETRIES: u32 = 3;

/// Serializes calls to a single provider, spacing them by the policy's
/// effective interval and backing off on 429s.
pub struct CallScheduler {
    policy: SchedulerPolicy,
    last_call_at_ms: AtomicU64,
    start: Instant,
}

impl CallScheduler {
    pub fn new(policy: SchedulerPolicy) -> Self {
        Self {
            policy,
            last_call_at_ms: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn estimated_remaining_ms(&self, remaining_iterations: u32) -> u64 {
        self.policy.interval_ms() * remaining_iterations as u64
    }

    /// Runs `task`, waiting out the policy's pacing interval first and
    /// retrying on rate-limited failures.
    pub async fn execute<T, E, F, Fut>(
        &self,
        remaining_iterations: u32,
        mut throttle: Option<&mut (dyn FnMut(ThrottleEvent) + Send)>,
        mut task: F,
    ) -> Result<T, SchedulerError<E>>
    where
        E: RetryableError + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let interval = self.policy.interval_ms();
        let now = self.now_ms();
        let last = self.last_call_at_ms.load(Ordering::Acquire);
        let wait = interval.saturating_sub(now.saturating_sub(last));

        if wait > 0 {
            if let Some(cb) = throttle.as_deref_mut() {
                cb(ThrottleEvent {
                    delay_ms: wait,
                    eta_ms: wait + self.estimated_remaining_ms(remaining_iterations),
                    remaining_iterations,
                    policy: self.policy,
                });
            }
            sleep(Duration::from_millis(wait)).await;
        }

        let mut attempt = 0u32;
        loop {
            match task().await {
                Ok(value) => {
                    self.last_call_at_ms.store(self.now_ms(), Ordering::Release);
                    return Ok(value);
                }
                Err(err) if err.is_rate_limited() && attempt < MAX_RETRIES => {
                    let backoff_ms = err
                        .retry_after_secs()
                        .map(|secs| secs * 1000)
                        .unwrap_or_else(|| self.policy.retry_after_ms * 2u64.pow(attempt));
                    tracing::warn!(attempt, backoff_ms, "provider rate limited, backing off");
                    sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                Err(err) if err.is_rate_limited() => {
                    return Err(SchedulerError::RetriesExhausted);
                }
                Err(err) => return Err(SchedulerError::Task(err)),
            }
        }
    }
}

/// Process-wide registry of one [`CallScheduler`] per provider id.
#[derive(Default)]
pub struct SchedulerRegistry {
    schedulers: DashMap<String, Arc<CallScheduler>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduler_for(&self, provider_id: &str, policy: SchedulerPolicy) -> Arc<CallScheduler> {
        self.schedulers
            .entry(provider_id.to_string())
            .or_insert_with(|| Arc::new(CallScheduler::new(policy)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[derive(Debug, thiserror::Error)]
    #[error("rate limited")]
    struct RateLimitedError {
        retry_after: Option<u64>,
    }

    impl RetryableError for RateLimitedError {
        fn is_rate_limited(&self) -> bool {
            true
        }
        fn retry_after_secs(&self) -> Option<u64> {
            self.retry_after
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("fatal")]
    struct FatalError;

    impl RetryableError for FatalError {
        fn is_rate_limited(&self) -> bool {
            false
        }
        fn retry_after_secs(&self) -> Option<u64> {
            None
        }
    }

    fn fast_policy() -> SchedulerPolicy {
        SchedulerPolicy {
            requests_per_minute: 6000,
            min_interval_ms: 0,
            retry_after_ms: 1,
        }
    }

    #[tokio::test]
    async fn successful_call_updates_last_call_timestamp() {
        let scheduler = CallScheduler::new(fast_policy());
        let result: Result<u32, SchedulerError<FatalError>> =
            scheduler.execute(0, None, || async { Ok(7u32) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn non_rate_limit_error_propagates_immediately() {
        let scheduler = CallScheduler::new(fast_policy());
        let calls = AtomicU32::new(0);
        let result: Result<u32, SchedulerError<FatalError>> = scheduler
            .execute(0, None, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FatalError) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limited_error_retries_then_succeeds() {
        let scheduler = CallScheduler::new(fast_policy());
        let calls = AtomicU32::new(0);
        let result: Result<u32, SchedulerError<RateLimitedError>> = scheduler
            .execute(0, None, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RateLimitedError {
                            retry_after: Some(0),
                        })
                    } else {
                        Ok(99u32)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limited_error_exhausts_retries() {
        let scheduler = CallScheduler::new(fast_policy());
        let result: Result<u32, SchedulerError<RateLimitedError>> = scheduler
            .execute(0, None, || async {
                Err(RateLimitedError { retry_after: Some(0) })
            })
            .await;
        assert!(matches!(result, Err(SchedulerError::RetriesExhausted)));
    }

    #[test]
    fn registry_reuses_scheduler_per_provider() {
        let registry = SchedulerRegistry::new();
        let a = registry.scheduler_for("openai", fast_policy());
        let b = registry.scheduler_for("openai", fast_policy());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
