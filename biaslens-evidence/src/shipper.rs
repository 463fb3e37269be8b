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

//! Adaptive batch shipping of captured evidence to a configured backend.

use std::sync::Arc;
use std::time::Duration;

use biaslens_core::{CapturedEvidence, ConfidenceInterval, DeterminismMode, EvidenceReference, ParametersUsed, PerIterationResult};
use std::collections::HashMap;

use crate::backends::{store_with_retry, EvidenceBackend, EvidenceData, DEFAULT_MAX_RETRIES};

/// Evidence is shipped synchronously (inline with the evaluation) unless
/// both thresholds are crossed, in which case shipping moves to a
/// best-effort background task so the evaluation can finish without
/// waiting on it (see DESIGN.md for the open-question resolution).
const ASYNC_ITEM_THRESHOLD: usize = 100;

const SYNC_INITIAL_DELAY: Duration = Duration::from_millis(100);
const ASYNC_INITIAL_DELAY: Duration = Duration::from_millis(200);
const SYNC_MAX_INTER_BATCH_DELAY: Duration = Duration::from_millis(10_000);
const ASYNC_MAX_INTER_BATCH_DELAY: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipMode {
    Sync,
    Async,
}

/// Decides sync vs. async shipping for a batch of this size.
pub fn decide_ship_mode(captured_count: usize, collector_available: bool) -> ShipMode {
    if captured_count > ASYNC_ITEM_THRESHOLD && collector_available {
        ShipMode::Async
    } else {
        ShipMode::Sync
    }
}

pub struct BatchShipResult {
    pub references: Vec<EvidenceReference>,
    pub shipped_count: usize,
    pub failed_count: usize,
    /// Whether any shipped item, across the whole run, hit a rate-limit
    /// error (status 429, `rate_limit_info` set, or a "rate limit" message).
    pub rate_limit_encountered: bool,
    /// Consecutive rate-limited items seen at the moment shipping finished.
    /// Reset to zero by a successful store; *not* reset by a non-rate-limit
    /// error (see DESIGN.md for the open-question resolution).
    pub consecutive_rate_limit_errors: u32,
}

pub struct EvidenceBatchShipper {
    backend: Arc<dyn EvidenceBackend>,
}

impl EvidenceBatchShipper {
    pub fn new(backend: Arc<dyn EvidenceBackend>) -> Self {
        Self { backend }
    }

    /// Ships `items` in backend-sized batches, adapting the inter-batch
    /// delay to observed rate-limit pressure per-item: a rate-limited item
    /// sets the delay to `min(retryAfter, cap)` when the backend supplied a
    /// `Retry-After` hint, else doubles the current delay (capped at 10s
    /// sync / 15s async); any other error leaves the delay untouched. A
    /// batch with zero rate-limited items decays the delay by a factor of
    /// 0.9, floored at the mode's initial value.
    pub async fn ship_all(
        &self,
        evaluation_id: &str,
        determinism_mode: DeterminismMode,
        seed_value: i64,
        iterations_run: u32,
        achieved_level: Option<String>,
        parameters_used: &ParametersUsed,
        per_iteration_results: &[PerIterationResult],
        items: Vec<CapturedEvidence>,
        mode: ShipMode,
    ) -> BatchShipResult {
        let batch_size = self.backend.batch_size();
        let (initial_delay, max_delay) = match mode {
            ShipMode::Sync => (SYNC_INITIAL_DELAY, SYNC_MAX_INTER_BATCH_DELAY),
            ShipMode::Async => (ASYNC_INITIAL_DELAY, ASYNC_MAX_INTER_BATCH_DELAY),
        };
        let mut delay = initial_delay;

        let mut references = Vec::new();
        let mut shipped = 0usize;
        let mut failed = 0usize;
        let mut rate_limit_encountered = false;
        let mut consecutive_rate_limit_errors = 0u32;

        for (batch_index, batch) in items.chunks(batch_size).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(delay).await;
            }

            let mut batch_rate_limited = false;

            for evidence in batch {
                let data = EvidenceData {
                    evaluation_run_id: evaluation_id.to_string(),
                    test_case_id: evidence.test_case_id.clone(),
                    iteration: evidence.iteration,
                    timestamp_us: evidence.timestamp_us,
                    prompt: evidence.prompt.clone(),
                    output: evidence.output.clone(),
                    reference_id: evidence.reference_id.clone(),
                    metadata: HashMap::new(),
                };

                match store_with_retry(self.backend.as_ref(), &data, DEFAULT_MAX_RETRIES).await {
                    Ok(info) => {
                        shipped += 1;
                        consecutive_rate_limit_errors = 0;
                        references.push(EvidenceReference {
                            evaluation_id: evaluation_id.to_string(),
                            test_case_id: evidence.test_case_id.clone(),
                            reference_id: info.reference_id,
                            storage_location: info.storage_location,
                            storage_type: info.storage_type.to_string(),
                            determinism_mode,
                            seed_value,
                            iterations_run,
                            achieved_level: achieved_level.clone(),
                            parameters_used: parameters_used.clone(),
                            confidence_intervals: HashMap::<String, ConfidenceInterval>::new(),
                            per_iteration_results: per_iteration_results.to_vec(),
                        });
                    }
                    Err(err) => {
                        failed += 1;
                        if err.is_rate_limited() {
                            batch_rate_limited = true;
                            rate_limit_encountered = true;
                            consecutive_rate_limit_errors += 1;
                            delay = match err.rate_limit_info.as_ref().and_then(|info| info.retry_after) {
                                Some(retry_after) => retry_after.min(max_delay),
                                None => (delay * 2).min(max_delay),
                            };
                        }
                        tracing::warn!(
                            evaluation_id,
                            test_case_id = %evidence.test_case_id,
                            error = %err,
                            "evidence item dropped after exhausting retries"
                        );
                    }
                }
            }

            if !batch_rate_limited {
                delay = (delay.mul_f64(0.9)).max(initial_delay);
            }
        }

        tracing::info!(
            evaluation_id,
            shipped,
            failed,
            total = shipped + failed,
            rate_limit_encountered,
            "evidence batch shipping complete"
        );

        BatchShipResult {
            references,
            shipped_count: shipped,
            failed_count: failed,
            rate_limit_encountered,
            consecutive_rate_limit_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackend;
    use biaslens_core::HeuristicType;

    fn evidence(id: &str, iteration: u32) -> CapturedEvidence {
        CapturedEvidence {
            prompt: "prompt".into(),
            output: "output".into(),
            test_case_id: id.into(),
            iteration,
            timestamp_us: 0,
            heuristic_type: HeuristicType::Anchoring,
            reference_id: format!("evaluation-run-run-1-test-case-{id}-iteration-{iteration}-uuid"),
        }
    }

    fn parameters() -> ParametersUsed {
        ParametersUsed {
            temperature: 0.7,
            top_p: 1.0,
            top_k: None,
            max_tokens: 256,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ships_all_items_and_builds_references() {
        let backend = Arc::new(MockBackend::new());
        let shipper = EvidenceBatchShipper::new(backend.clone());
        let items = vec![evidence("case-1", 0), evidence("case-2", 1)];

        let result = shipper
            .ship_all("run-1", DeterminismMode::Standard, 42, 2, None, &parameters(), &[], items, ShipMode::Sync)
            .await;

        assert_eq!(result.shipped_count, 2);
        assert_eq!(result.failed_count, 0);
        assert_eq!(result.references.len(), 2);
        assert_eq!(backend.stored().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_transient_failures_via_retry() {
        let backend = Arc::new(MockBackend::new().failing_times(2));
        let shipper = EvidenceBatchShipper::new(backend.clone());
        let items = vec![evidence("case-1", 0)];

        let result = shipper
            .ship_all("run-1", DeterminismMode::Standard, 42, 1, None, &parameters(), &[], items, ShipMode::Sync)
            .await;

        assert_eq!(result.shipped_count, 1);
        assert_eq!(result.failed_count, 0);
    }

    #[test]
    fn async_mode_requires_both_threshold_and_availability() {
        assert!(matches!(decide_ship_mode(150, true), ShipMode::Async));
        assert!(matches!(decide_ship_mode(150, false), ShipMode::Sync));
        assert!(matches!(decide_ship_mode(10, true), ShipMode::Sync));
    }
}
