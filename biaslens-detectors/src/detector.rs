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

//! The `Detector` contract and one struct per heuristic, following a
//! one-struct-per-evaluator layout. Each struct is a thin wrapper over
//! [`run_heuristic`] — the round-robin iteration schedule, scheduler
//! pacing, and aggregation are shared; only the catalog and scorer differ.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use biaslens_core::{
    CapturedEvidence, ConfidenceInterval, HeuristicFinding, HeuristicType, PerIterationResult,
    Severity,
};
use biaslens_providers::{ChatMessage, ChatParameters, ModelClient, ProviderError};
use biaslens_scheduler::{CallScheduler, ThrottleEvent};

use crate::error::DetectorError;
use crate::scoring::{aggregate, example_instances, raw_metric, severity_from_raw, BiasScorer};
use crate::test_cases::{catalog_for, TestCase};

/// Per-run context a `Detector` needs to execute. Borrowed for the
/// duration of one heuristic's run within the orchestrator's background
/// task.
pub struct DetectorContext<'a> {
    pub evaluation_run_id: &'a str,
    pub iterations: u32,
    pub model_client: Arc<dyn ModelClient>,
    pub scheduler: Arc<CallScheduler>,
    pub parameters: ChatParameters,
    /// `Some` only when evidence collection is enabled for this team;
    /// captured tuples are appended here and never reach a control-plane
    /// store directly.
    pub evidence_sink: Option<&'a mut Vec<CapturedEvidence>>,
    /// Invoked by the scheduler before any wait longer than zero, so the
    /// orchestrator can fold the ETA into a progress message.
    pub throttle: Option<&'a mut (dyn FnMut(ThrottleEvent) + Send)>,
}

pub struct DetectorOutcome {
    pub finding: HeuristicFinding,
    pub per_iteration_results: Vec<PerIterationResult>,
}

#[async_trait]
pub trait Detector: Send + Sync {
    fn heuristic_type(&self) -> HeuristicType;
    async fn run(&self, ctx: DetectorContext<'_>) -> Result<DetectorOutcome, DetectorError>;
}

fn build_prompt(test_case: &TestCase) -> String {
    test_case.prompt.clone()
}

/// Iteration reference grammar: `test-case-{sanitizedTestCaseId}-{iteration}-{uuid}`.
fn reference_id(test_case_id: &str, iteration: u32) -> String {
    let sanitized = biaslens_core::ids::sanitize_reference_component(test_case_id);
    format!("test-case-{sanitized}-{iteration}-{}", biaslens_core::ids::new_id())
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

fn output_hash(output: &str) -> String {
    hex::encode(Sha256::digest(output.as_bytes()))
}

/// Shared execution for every heuristic: round-robin over the catalog
/// (`call index i -> case i mod |cases|, iteration floor(i/|cases|)+1`),
/// pace calls through the scheduler, score each response, capture evidence
/// when enabled, and aggregate into a `HeuristicFinding`.
async fn run_heuristic(
    heuristic: HeuristicType,
    scorer: &dyn BiasScorer,
    mut ctx: DetectorContext<'_>,
) -> Result<DetectorOutcome, DetectorError> {
    tracing::debug!(
        evaluation_run_id = ctx.evaluation_run_id,
        heuristic = heuristic.as_str(),
        iterations = ctx.iterations,
        "starting heuristic detection"
    );
    let catalog = catalog_for(heuristic);
    let n_cases = catalog.len().max(1);
    let mut scores = Vec::with_capacity(ctx.iterations as usize);
    let mut per_iteration = Vec::with_capacity(ctx.iterations as usize);
    let mut used_cases: Vec<&TestCase> = Vec::new();

    for i in 0..ctx.iterations {
        let case_idx = (i as usize) % n_cases;
        let iteration = (i as usize / n_cases) as u32 + 1;
        let test_case = &catalog[case_idx];
        used_cases.push(test_case);

        let prompt = build_prompt(test_case);
        let remaining = ctx.iterations - i - 1;
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.clone(),
        }];
        let params = ctx.parameters.clone();
        let client = ctx.model_client.clone();
        let scheduler = ctx.scheduler.clone();

        let response = scheduler
            .execute::<_, ProviderError, _, _>(remaining, ctx.throttle.as_deref_mut(), || {
                let client = client.clone();
                let messages = messages.clone();
                let params = params.clone();
                async move { client.chat(messages, &params).await }
            })
            .await
            .map_err(|e| DetectorError::ModelCall(e.to_string()))?;

        let score = scorer.score(test_case, &prompt, &response.content);
        scores.push(score);

        let hash = output_hash(&response.content);
        let mut reference_id_value = None;
        if let Some(sink) = ctx.evidence_sink.as_deref_mut() {
            let rid = reference_id(&test_case.id, iteration);
            sink.push(CapturedEvidence {
                prompt: prompt.clone(),
                output: response.content.clone(),
                test_case_id: test_case.id.clone(),
                iteration,
                timestamp_us: now_us(),
                heuristic_type: heuristic,
                reference_id: rid.clone(),
            });
            reference_id_value = Some(rid);
        }

        per_iteration.push(PerIterationResult {
            test_case_id: test_case.id.clone(),
            iteration,
            heuristic_type: heuristic,
            score,
            output_hash: hash,
            reference_id: reference_id_value,
        });
    }

    let agg = aggregate(&scores);
    let raw = raw_metric(heuristic, agg.mean);
    let (severity_score, severity) = severity_from_raw(heuristic, raw);

    let finding = HeuristicFinding {
        evaluation_id: String::new(), // filled in by the orchestrator
        heuristic_type: heuristic,
        severity,
        severity_score,
        confidence_level: agg.confidence_level,
        detection_count: agg.detections,
        example_instances: example_instances(&used_cases, 5),
        pattern_description: pattern_description(heuristic, severity),
        test_cases_run: catalog.len() as u32,
        mean_bias_score: agg.mean,
        std_deviation: agg.std_deviation,
        confidence_interval: ConfidenceInterval {
            lo: agg.confidence_interval.lo,
            hi: agg.confidence_interval.hi,
        },
    };

    Ok(DetectorOutcome {
        finding,
        per_iteration_results: per_iteration,
    })
}

fn pattern_description(heuristic: HeuristicType, severity: Severity) -> String {
    format!(
        "{} bias probes returned a {} aggregate signal across the fixed test catalog",
        heuristic.as_str(),
        severity.as_str()
    )
}

macro_rules! heuristic_detector {
    ($name:ident, $heuristic:expr) => {
        pub struct $name {
            scorer: Arc<dyn BiasScorer>,
        }

        impl $name {
            pub fn new(scorer: Arc<dyn BiasScorer>) -> Self {
                Self { scorer }
            }
        }

        #[async_trait]
        impl Detector for $name {
            fn heuristic_type(&self) -> HeuristicType {
                $heuristic
            }

            async fn run(
                &self,
                ctx: DetectorContext<'_>,
            ) -> Result<DetectorOutcome, DetectorError> {
                run_heuristic($heuristic, self.scorer.as_ref(), ctx).await
            }
        }
    };
}

heuristic_detector!(AnchoringDetector, HeuristicType::Anchoring);
heuristic_detector!(LossAversionDetector, HeuristicType::LossAversion);
heuristic_detector!(SunkCostDetector, HeuristicType::SunkCost);
heuristic_detector!(ConfirmationBiasDetector, HeuristicType::ConfirmationBias);
heuristic_detector!(AvailabilityDetector, HeuristicType::AvailabilityHeuristic);

/// Builds the concrete `Detector` for a requested heuristic, sharing one
/// scorer instance across all five — a tagged-variant lookup in place of a
/// deep inheritance hierarchy.
pub fn detector_for(heuristic: HeuristicType, scorer: Arc<dyn BiasScorer>) -> Box<dyn Detector> {
    match heuristic {
        HeuristicType::Anchoring => Box::new(AnchoringDetector::new(scorer)),
        HeuristicType::LossAversion => Box::new(LossAversionDetector::new(scorer)),
        HeuristicType::SunkCost => Box::new(SunkCostDetector::new(scorer)),
        HeuristicType::ConfirmationBias => Box::new(ConfirmationBiasDetector::new(scorer)),
        HeuristicType::AvailabilityHeuristic => Box::new(AvailabilityDetector::new(scorer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biaslens_providers::SimulatedModelClient;
    use biaslens_scheduler::SchedulerPolicy;
    use crate::scoring::KeywordHeuristicScorer;

    fn fast_policy() -> SchedulerPolicy {
        SchedulerPolicy {
            requests_per_minute: 100_000,
            min_interval_ms: 0,
            retry_after_ms: 1,
        }
    }

    #[tokio::test]
    async fn anchoring_detector_runs_to_completion_with_simulator() {
        let scorer: Arc<dyn BiasScorer> = Arc::new(KeywordHeuristicScorer::default());
        let detector = AnchoringDetector::new(scorer);
        let scheduler = Arc::new(CallScheduler::new(fast_policy()));
        let client: Arc<dyn ModelClient> = Arc::new(SimulatedModelClient::new("openai"));

        let mut evidence = Vec::new();
        let ctx = DetectorContext {
            evaluation_run_id: "run-1",
            iterations: 10,
            model_client: client,
            scheduler,
            parameters: ChatParameters {
                temperature: 0.7,
                top_p: Some(1.0),
                top_k: None,
                max_tokens: 256,
                seed: Some(42),
            },
            evidence_sink: Some(&mut evidence),
            throttle: None,
        };

        let outcome = detector.run(ctx).await.unwrap();
        assert_eq!(outcome.per_iteration_results.len(), 10);
        assert_eq!(evidence.len(), 10);
        assert!(outcome.finding.severity_score >= 0.0 && outcome.finding.severity_score <= 100.0);
        assert_eq!(outcome.finding.test_cases_run as usize, catalog_for(HeuristicType::Anchoring).len());
    }

    #[tokio::test]
    async fn round_robin_covers_all_catalog_entries_before_repeating() {
        let scorer: Arc<dyn BiasScorer> = Arc::new(KeywordHeuristicScorer::default());
        let detector = SunkCostDetector::new(scorer);
        let scheduler = Arc::new(CallScheduler::new(fast_policy()));
        let client: Arc<dyn ModelClient> = Arc::new(SimulatedModelClient::new("openai"));
        let n_cases = catalog_for(HeuristicType::SunkCost).len();

        let ctx = DetectorContext {
            evaluation_run_id: "run-2",
            iterations: n_cases as u32,
            model_client: client,
            scheduler,
            parameters: ChatParameters {
                temperature: 0.0,
                top_p: None,
                top_k: None,
                max_tokens: 64,
                seed: None,
            },
            evidence_sink: None,
            throttle: None,
        };

        let outcome = detector.run(ctx).await.unwrap();
        let mut ids: Vec<&str> = outcome
            .per_iteration_results
            .iter()
            .map(|r| r.test_case_id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), n_cases);
    }
}
