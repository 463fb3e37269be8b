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

//! The evaluation orchestrator: the synchronous intake that creates an
//! `Evaluation` row and the background task that drives it to `completed`
//! or `failed`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use biaslens_core::store::{
    EvaluationStore, EvidenceConfigStore, EvidenceReferenceStore, FindingStore, ProgressStore, RecommendationStore,
    ReproPackStore, SigningKeyStore,
};
use biaslens_core::*;
use biaslens_crypto::decrypt_credential;
use biaslens_detectors::{build_recommendations, detector_for, BiasScorer, DetectorContext, KeywordHeuristicScorer};
use biaslens_evidence::{
    decide_ship_mode, BatchShipResult, DocumentSearchBackend, EvidenceBackend, EvidenceBatchShipper, LogSearchBackend,
    MockBackend, ObjectStoreBackend, ShipMode,
};
use biaslens_providers::{
    resolve_achieved_level, should_reject_determinism_request, AnthropicClient, ChatParameters, DeepSeekClient,
    ModelClient, OllamaClient, OpenAiClient, SimulatedModelClient,
};
use biaslens_repro::build_repro_pack;
use biaslens_scheduler::SchedulerPolicy;

use crate::error::OrchestratorError;
use crate::state::AppState;

/// What the caller receives from `POST /evaluate` before the background
/// task has run. `model_client` and `provider` are not part
/// of the persisted `Evaluation` row; the HTTP handler needs both to spawn
/// [`run_background`] without re-resolving them from config.
pub struct EvaluationEnvelope {
    pub evaluation: Evaluation,
    pub model_client: Arc<dyn ModelClient>,
    pub provider: String,
}

fn default_scheduler_policy() -> SchedulerPolicy {
    SchedulerPolicy {
        requests_per_minute: 60,
        min_interval_ms: 1000,
        retry_after_ms: 2000,
    }
}

fn build_model_client(
    state: &AppState,
    provider: &str,
    model_name: &str,
) -> Result<Arc<dyn ModelClient>, OrchestratorError> {
    let llm = &state.config.llm;
    let client: Arc<dyn ModelClient> = match provider {
        "simulated" => Arc::new(SimulatedModelClient::new(provider)),
        "openai" => {
            let key = llm
                .openai_api_key
                .clone()
                .ok_or_else(|| OrchestratorError::Input("no OpenAI API key configured".into()))?;
            Arc::new(OpenAiClient::new(key, model_name.to_string()))
        }
        "anthropic" => {
            let key = llm
                .anthropic_api_key
                .clone()
                .ok_or_else(|| OrchestratorError::Input("no Anthropic API key configured".into()))?;
            Arc::new(AnthropicClient::new(key, model_name.to_string()))
        }
        "deepseek" => {
            let key = llm
                .deepseek_api_key
                .clone()
                .ok_or_else(|| OrchestratorError::Input("no DeepSeek API key configured".into()))?;
            Arc::new(DeepSeekClient::new(key, model_name.to_string()))
        }
        "ollama" => {
            let base_url = llm
                .ollama_base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            Arc::new(OllamaClient::new(base_url, model_name.to_string()))
        }
        other => return Err(OrchestratorError::Input(format!("unknown model provider '{other}'"))),
    };
    Ok(client)
}

struct ResolvedPolicy {
    determinism_mode: DeterminismMode,
    achieved_level: Option<String>,
    seed_value: i64,
    parameters_used: ParametersUsed,
}

fn resolve_policy(
    state: &AppState,
    provider: &str,
    deterministic: &DeterministicRequest,
) -> Result<ResolvedPolicy, OrchestratorError> {
    let caps = state.capability_registry.capabilities_for(provider);

    if should_reject_determinism_request(&caps, deterministic.enabled, deterministic.allow_nondeterministic_fallback) {
        return Err(OrchestratorError::Input(format!(
            "provider '{provider}' does not support deterministic evaluation and fallback is disabled: {}",
            caps.guidance
        )));
    }

    let requested_temperature = deterministic.temperature.unwrap_or(state.config.model_defaults.temperature);
    let requested_top_k = state.config.model_defaults.top_k;

    let achieved = resolve_achieved_level(&caps, deterministic.enabled, Some(requested_temperature), requested_top_k);

    let determinism_mode = if !deterministic.enabled || caps.seed_support == biaslens_providers::SeedSupport::None {
        DeterminismMode::Standard
    } else {
        match deterministic.level {
            DeterminismLevel::Full => DeterminismMode::Full,
            DeterminismLevel::Near => DeterminismMode::Near,
            DeterminismLevel::Adaptive => DeterminismMode::Adaptive,
        }
    };

    let mut temperature = requested_temperature.max(caps.min_temperature);
    if deterministic.keep_temperature_constant {
        temperature = requested_temperature;
    }

    let top_p = state.config.model_defaults.top_p.unwrap_or(1.0);
    let top_k = match caps.decoding_support {
        biaslens_providers::DecodingSupport::TopPTopK => requested_top_k,
        _ => None,
    };

    let seed_value = deterministic.seed.unwrap_or_else(|| state.config.model_defaults.seed.unwrap_or(0));

    Ok(ResolvedPolicy {
        determinism_mode,
        achieved_level: Some(achieved),
        seed_value,
        parameters_used: ParametersUsed {
            temperature,
            top_p,
            top_k,
            max_tokens: state.config.model_defaults.max_tokens,
        },
    })
}

fn build_evidence_backend(
    storage_type: &str,
    fields: &serde_json::Map<String, serde_json::Value>,
    configuration: &HashMap<String, String>,
) -> Result<Arc<dyn EvidenceBackend>, OrchestratorError> {
    let field = |key: &str| -> Option<String> {
        fields
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| configuration.get(key).cloned())
    };

    match storage_type {
        "object_store" => {
            let endpoint = field("endpoint").ok_or_else(|| OrchestratorError::Config("object_store: missing endpoint".into()))?;
            let bucket = field("bucket").ok_or_else(|| OrchestratorError::Config("object_store: missing bucket".into()))?;
            let access_key = field("access_key").unwrap_or_default();
            let secret_key = field("secret_key").unwrap_or_default();
            Ok(Arc::new(ObjectStoreBackend::new(endpoint, bucket, access_key, secret_key)))
        }
        "log_search" => {
            let endpoint = field("endpoint").ok_or_else(|| OrchestratorError::Config("log_search: missing endpoint".into()))?;
            let index = field("index").unwrap_or_else(|| "main".to_string());
            match (field("username"), field("password")) {
                (Some(username), Some(password)) => Ok(Arc::new(LogSearchBackend::with_basic_auth(endpoint, username, password, index))),
                _ => {
                    let token = field("token").unwrap_or_default();
                    Ok(Arc::new(LogSearchBackend::new(endpoint, token, index)))
                }
            }
        }
        "document_search" => {
            let endpoint = field("endpoint").ok_or_else(|| OrchestratorError::Config("document_search: missing endpoint".into()))?;
            let index = field("index").unwrap_or_else(|| "evidence".to_string());
            match (field("username"), field("password")) {
                (Some(username), Some(password)) => {
                    Ok(Arc::new(DocumentSearchBackend::with_basic_auth(endpoint, username, password, index)))
                }
                _ => {
                    let api_key = field("api_key").unwrap_or_default();
                    Ok(Arc::new(DocumentSearchBackend::new(endpoint, index, api_key)))
                }
            }
        }
        "mock" => {
            let rate_limited = field("rate_limited").as_deref() == Some("true");
            Ok(Arc::new(MockBackend::new().with_always_rate_limited(rate_limited)))
        }
        other => Err(OrchestratorError::Config(format!("unknown evidence storage type '{other}'"))),
    }
}

/// Step 4 of intake: best-effort evidence-collector construction. Any
/// failure degrades to standard (evidence disabled).
fn try_load_evidence_backend(state: &AppState, team_id: &str) -> Option<Arc<dyn EvidenceBackend>> {
    let storage_type = state.config.evidence.default_storage_type.as_deref()?;

    let config = match EvidenceConfigStore::get(&state.store, team_id, storage_type) {
        Ok(Some(config)) if config.is_enabled => config,
        Ok(_) => return None,
        Err(e) => {
            warn!(event = "evidence_collection_config_error", error = %e, "no evidence config row");
            return None;
        }
    };

    info!(event = "evidence_collection_config_loaded", team_id, storage_type = %config.storage_type);

    let secret = match &state.config.secrets.api_key_encryption_secret {
        Some(secret) => secret,
        None => {
            warn!(event = "evidence_collection_config_error", "no API_KEY_ENCRYPTION_SECRET configured");
            return None;
        }
    };

    let credential = match decrypt_credential(secret, &config.credentials_encrypted, &config.storage_type) {
        Ok(credential) => credential,
        Err(e) => {
            warn!(event = "evidence_collection_config_error", error = %e, "evidence credential decryption failed");
            return None;
        }
    };

    match build_evidence_backend(&config.storage_type, &credential.fields, &config.configuration) {
        Ok(backend) => {
            info!(event = "evidence_collector_created", team_id, storage_type = %config.storage_type);
            Some(backend)
        }
        Err(e) => {
            warn!(event = "evidence_collector_creation_failed", error = %e);
            None
        }
    }
}

/// Intake: resolves and validates a request, then creates the evaluation
/// and progress rows. Authentication happens in the HTTP
/// layer (`crate::auth`); this function receives the already-resolved
/// `team_id`. Returns as soon as the evaluation and progress rows exist;
/// the caller is responsible for spawning [`run_background`].
pub fn intake(
    state: &AppState,
    team_id: &str,
    user_id: Option<&str>,
    request: EvaluationRequest,
) -> Result<EvaluationEnvelope, OrchestratorError> {
    request.validate()?;

    let provider = if request.llm_config_id.is_some() {
        request
            .llm_config_id
            .clone()
            .expect("checked is_some above")
    } else {
        state.config.model_defaults.provider.clone()
    };
    let model_name = state.config.model_defaults.model_name.clone();

    // Step 5: llmConfigId resolution is fatal to the request on failure.
    let model_client = build_model_client(state, &provider, &model_name)?;

    let deterministic = request.deterministic.clone().unwrap_or(DeterministicRequest {
        enabled: false,
        level: DeterminismLevel::Full,
        seed: None,
        allow_nondeterministic_fallback: true,
        temperature: None,
        keep_temperature_constant: false,
    });
    let policy = resolve_policy(state, &provider, &deterministic)?;

    let now = Utc::now().to_rfc3339();
    let evaluation_id = new_id();

    let evaluation = Evaluation {
        id: evaluation_id.clone(),
        user_id: user_id.unwrap_or_default().to_string(),
        team_id: team_id.to_string(),
        ai_system_name: request.ai_system_name.clone(),
        heuristic_types: request.heuristic_types.clone(),
        iteration_count: request.iteration_count,
        status: EvaluationStatus::Running,
        determinism_mode: policy.determinism_mode,
        seed_value: policy.seed_value,
        achieved_level: policy.achieved_level.clone(),
        parameters_used: policy.parameters_used.clone(),
        iterations_run: 0,
        overall_score: None,
        zone_status: None,
        created_at: now.clone(),
        completed_at: None,
        evidence_reference_id: None,
        evidence_storage_type: None,
        confidence_intervals: HashMap::new(),
        per_iteration_results: Vec::new(),
        failure_message: None,
    };
    EvaluationStore::insert(&state.store, evaluation.clone())?;

    state.store.upsert(EvaluationProgress {
        id: new_id(),
        evaluation_id: evaluation_id.clone(),
        progress_percent: 0,
        current_phase: ProgressPhase::Initializing,
        current_heuristic: None,
        tests_completed: 0,
        tests_total: 0,
        message: Some("Evaluation created".to_string()),
        updated_at: now,
    })?;

    Ok(EvaluationEnvelope {
        evaluation,
        model_client,
        provider,
    })
}

/// Background task: runs the heuristic loop, evidence shipping and repro
/// pack build. Spawned via `tokio::spawn` from the HTTP handler immediately
/// after [`intake`] returns.
#[allow(clippy::too_many_arguments)]
pub async fn run_background(
    state: AppState,
    evaluation_id: String,
    team_id: String,
    ai_system_name: String,
    provider: String,
    model_client: Arc<dyn ModelClient>,
    parameters_used: ParametersUsed,
    determinism_mode: DeterminismMode,
    seed_value: i64,
    achieved_level: Option<String>,
    heuristic_types: Vec<HeuristicType>,
    iteration_count: u32,
) {
    if let Err(e) = run_background_inner(
        &state,
        &evaluation_id,
        &team_id,
        &ai_system_name,
        &provider,
        model_client,
        &parameters_used,
        determinism_mode,
        seed_value,
        achieved_level,
        &heuristic_types,
        iteration_count,
    )
    .await
    {
        warn!(evaluation_id = %evaluation_id, error = %e, "evaluation failed");
        let message = e.to_string();
        let _ = state.store.update(&evaluation_id, |evaluation| {
            evaluation.status = EvaluationStatus::Failed;
            evaluation.failure_message = Some(message.clone());
            evaluation.completed_at = Some(Utc::now().to_rfc3339());
        });
        let _ = state.store.upsert(EvaluationProgress {
            id: new_id(),
            evaluation_id: evaluation_id.clone(),
            progress_percent: 100,
            current_phase: ProgressPhase::Failed,
            current_heuristic: None,
            tests_completed: 0,
            tests_total: 0,
            message: Some(e.to_string()),
            updated_at: Utc::now().to_rfc3339(),
        });
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_background_inner(
    state: &AppState,
    evaluation_id: &str,
    team_id: &str,
    ai_system_name: &str,
    provider: &str,
    model_client: Arc<dyn ModelClient>,
    parameters_used: &ParametersUsed,
    determinism_mode: DeterminismMode,
    seed_value: i64,
    achieved_level: Option<String>,
    heuristic_types: &[HeuristicType],
    iteration_count: u32,
) -> Result<(), OrchestratorError> {
    let scheduler = state.scheduler_registry.scheduler_for(provider, default_scheduler_policy());
    let scorer: Arc<dyn BiasScorer> = Arc::new(KeywordHeuristicScorer::default());

    let evidence_backend = try_load_evidence_backend(state, team_id);
    let mut evidence_items: Vec<CapturedEvidence> = Vec::new();

    update_progress(state, evaluation_id, 10, ProgressPhase::Detecting, None, "Preparing detection algorithms…")?;

    let total_heuristics = heuristic_types.len().max(1);
    let mut findings: Vec<HeuristicFinding> = Vec::new();
    let mut per_iteration_results: Vec<PerIterationResult> = Vec::new();

    let chat_params = ChatParameters {
        temperature: parameters_used.temperature,
        top_p: Some(parameters_used.top_p),
        top_k: parameters_used.top_k,
        max_tokens: parameters_used.max_tokens,
        seed: if determinism_mode == DeterminismMode::Standard { None } else { Some(seed_value) },
    };

    for (i, heuristic) in heuristic_types.iter().enumerate() {
        if state.store.is_cancelled(evaluation_id)? {
            info!(evaluation_id, "evaluation cancelled before heuristic {}", i);
            return Ok(());
        }

        let percent = 10 + (60 * i / total_heuristics) as u8;
        update_progress(
            state,
            evaluation_id,
            percent,
            ProgressPhase::Detecting,
            Some(*heuristic),
            &format!("Running {} detector…", heuristic.as_str()),
        )?;

        let detector = detector_for(*heuristic, scorer.clone());
        let mut sink = if evidence_backend.is_some() { Some(Vec::new()) } else { None };

        let state_for_throttle = state.clone();
        let evaluation_id_for_throttle = evaluation_id.to_string();
        let mut throttle = move |event: biaslens_scheduler::ThrottleEvent| {
            let message = format!(
                "Waiting {} ms for provider rate limit ({} calls remaining)…",
                event.delay_ms, event.remaining_iterations
            );
            let _ = state_for_throttle.store.upsert(EvaluationProgress {
                id: new_id(),
                evaluation_id: evaluation_id_for_throttle.clone(),
                progress_percent: percent,
                current_phase: ProgressPhase::Detecting,
                current_heuristic: Some(*heuristic),
                tests_completed: 0,
                tests_total: 0,
                message: Some(message),
                updated_at: Utc::now().to_rfc3339(),
            });
        };

        let ctx = DetectorContext {
            evaluation_run_id: evaluation_id,
            iterations: iteration_count,
            model_client: model_client.clone(),
            scheduler: scheduler.clone(),
            parameters: chat_params.clone(),
            evidence_sink: sink.as_mut(),
            throttle: Some(&mut throttle),
        };

        let outcome = detector.run(ctx).await.map_err(|e| OrchestratorError::Provider(e.to_string()))?;

        let mut finding = outcome.finding;
        finding.evaluation_id = evaluation_id.to_string();
        findings.push(finding);
        per_iteration_results.extend(outcome.per_iteration_results);

        if let Some(captured) = sink {
            evidence_items.extend(captured);
        }
    }

    let overall_score = compute_overall_score(&findings);
    let zone_status = ZoneStatus::from_score(overall_score);

    let mut confidence_intervals = HashMap::new();
    for finding in &findings {
        confidence_intervals.insert(finding.heuristic_type.as_str().to_string(), finding.confidence_interval);
    }

    let mut evidence_reference_id = None;
    let mut evidence_storage_type = None;
    let mut evidence_references: Vec<EvidenceReference> = Vec::new();

    if let Some(backend) = evidence_backend {
        update_progress(state, evaluation_id, 65, ProgressPhase::StoringEvidence, None, "Shipping captured evidence…")?;

        let mode = decide_ship_mode(evidence_items.len(), true);
        match mode {
            ShipMode::Sync => {
                let shipper = EvidenceBatchShipper::new(backend.clone());
                let result = shipper
                    .ship_all(
                        evaluation_id,
                        determinism_mode,
                        seed_value,
                        iteration_count,
                        achieved_level.clone(),
                        parameters_used,
                        &per_iteration_results,
                        evidence_items,
                        mode,
                    )
                    .await;

                if result.shipped_count > 0 {
                    evidence_reference_id = Some(new_run_reference(evaluation_id));
                    evidence_storage_type = Some(backend.storage_type().to_string());
                }
                warn_on_low_success_rate(evaluation_id, &result);
                evidence_references = result.references;
                EvidenceReferenceStore::insert_all(&state.store, evidence_references.clone())?;
            }
            ShipMode::Async => {
                info!(event = "evidence_async_started", evaluation_id, count = evidence_items.len());
                spawn_async_shipping(
                    state.clone(),
                    evaluation_id.to_string(),
                    backend.clone(),
                    determinism_mode,
                    seed_value,
                    iteration_count,
                    achieved_level.clone(),
                    parameters_used.clone(),
                    per_iteration_results.clone(),
                    evidence_items,
                );
                // §4.7/§4.9 step 7: async shipping continues after this task
                // marks the evaluation completed; `evidenceReferenceId`/
                // `evidenceStorageType` are filled in by the spawned task
                // once it knows how many items actually shipped.
            }
        }
    }

    update_progress(state, evaluation_id, 90, ProgressPhase::Finalizing, None, "Scoring results…")?;

    let recommendations = build_recommendations(evaluation_id, &findings);

    FindingStore::insert_all(&state.store, findings.clone())?;
    RecommendationStore::insert_all(&state.store, recommendations)?;

    let completed_at = Utc::now().to_rfc3339();
    state.store.update(evaluation_id, |evaluation| {
        evaluation.status = EvaluationStatus::Completed;
        evaluation.overall_score = Some(overall_score);
        evaluation.zone_status = Some(zone_status);
        evaluation.completed_at = Some(completed_at.clone());
        evaluation.iterations_run = iteration_count;
        evaluation.confidence_intervals = confidence_intervals.clone();
        evaluation.per_iteration_results = per_iteration_results.clone();
        evaluation.evidence_reference_id = evidence_reference_id.clone();
        evaluation.evidence_storage_type = evidence_storage_type.clone();
    })?;

    // Step 8: resolve signing material and build the repro pack. A missing
    // signing key is fatal and the evaluation is marked failed.
    let signing = resolve_signing_material(state, team_id)?;
    let manifest = build_manifest(
        state,
        evaluation_id,
        ai_system_name,
        provider,
        determinism_mode,
        seed_value,
        achieved_level,
        parameters_used,
        heuristic_types,
        iteration_count,
        overall_score,
        zone_status,
        &confidence_intervals,
        &per_iteration_results,
        evidence_reference_id.clone(),
        &signing,
    );
    let built = build_repro_pack(manifest, &signing, completed_at)?;
    ReproPackStore::insert(&state.store, built.pack)?;

    update_progress(state, evaluation_id, 100, ProgressPhase::Completed, None, "Evaluation completed")?;

    let state = state.clone();
    let evaluation_id = evaluation_id.to_string();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        let _ = state.store.delete(&evaluation_id);
    });

    Ok(())
}

fn new_run_reference(evaluation_id: &str) -> String {
    format!("evaluation-run-{evaluation_id}")
}

/// §4.7: "below 50% [success rate] produces a warning but not a failure."
fn warn_on_low_success_rate(evaluation_id: &str, result: &BatchShipResult) {
    if result.failed_count * 2 > result.shipped_count {
        warn!(
            evaluation_id,
            shipped = result.shipped_count,
            failed = result.failed_count,
            rate_limit_encountered = result.rate_limit_encountered,
            "evidence shipping success rate below 50%"
        );
    }
}

/// §4.7/§4.9 step 7: for the async path, shipping runs detached from the
/// task that marks the evaluation `completed` — `evidenceReferenceId`/
/// `evidenceStorageType` and the per-iteration `EvidenceReference` rows are
/// written in a follow-up update once shipping finishes, rather than
/// blocking completion on it.
#[allow(clippy::too_many_arguments)]
fn spawn_async_shipping(
    state: AppState,
    evaluation_id: String,
    backend: Arc<dyn EvidenceBackend>,
    determinism_mode: DeterminismMode,
    seed_value: i64,
    iteration_count: u32,
    achieved_level: Option<String>,
    parameters_used: ParametersUsed,
    per_iteration_results: Vec<PerIterationResult>,
    evidence_items: Vec<CapturedEvidence>,
) {
    tokio::spawn(async move {
        let shipper = EvidenceBatchShipper::new(backend.clone());
        let result = shipper
            .ship_all(
                &evaluation_id,
                determinism_mode,
                seed_value,
                iteration_count,
                achieved_level,
                &parameters_used,
                &per_iteration_results,
                evidence_items,
                ShipMode::Async,
            )
            .await;

        warn_on_low_success_rate(&evaluation_id, &result);

        let evidence_reference_id = (result.shipped_count > 0).then(|| new_run_reference(&evaluation_id));
        let evidence_storage_type = (result.shipped_count > 0).then(|| backend.storage_type().to_string());

        if let Err(e) = EvidenceReferenceStore::insert_all(&state.store, result.references.clone()) {
            warn!(evaluation_id, error = %e, "failed to persist async evidence references");
        }
        let update = state.store.update(&evaluation_id, |evaluation| {
            evaluation.evidence_reference_id = evidence_reference_id.clone();
            evaluation.evidence_storage_type = evidence_storage_type.clone();
        });
        if let Err(e) = update {
            warn!(evaluation_id, error = %e, "failed to record async evidence shipping result on evaluation row");
        }

        info!(
            event = "evidence_async_completed",
            evaluation_id,
            shipped = result.shipped_count,
            failed = result.failed_count,
            rate_limit_encountered = result.rate_limit_encountered,
        );
    });
}

fn compute_overall_score(findings: &[HeuristicFinding]) -> f64 {
    if findings.is_empty() {
        return 75.0;
    }
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for finding in findings {
        let weight = finding.confidence_level * (finding.severity_score / 100.0 + 0.5);
        weighted_sum += finding.severity_score * weight;
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        75.0
    } else {
        weighted_sum / weight_sum
    }
}

fn update_progress(
    state: &AppState,
    evaluation_id: &str,
    percent: u8,
    phase: ProgressPhase,
    heuristic: Option<HeuristicType>,
    message: &str,
) -> Result<(), OrchestratorError> {
    state.store.upsert(EvaluationProgress {
        id: new_id(),
        evaluation_id: evaluation_id.to_string(),
        progress_percent: percent,
        current_phase: phase,
        current_heuristic: heuristic,
        tests_completed: 0,
        tests_total: 0,
        message: Some(message.to_string()),
        updated_at: Utc::now().to_rfc3339(),
    })?;
    Ok(())
}

fn resolve_signing_material(state: &AppState, team_id: &str) -> Result<SigningMaterial, OrchestratorError> {
    if let Some(material) = state.store.customer_signing_material(team_id)? {
        return Ok(material);
    }

    let secrets = &state.config.secrets;
    let (Some(private_key_pem), Some(public_key_pem)) = (
        secrets.repro_pack_signing_private_key.clone(),
        secrets.repro_pack_signing_public_key.clone(),
    ) else {
        return Err(OrchestratorError::Config(
            "no signing key available: no customer override and REPRO_PACK_SIGNING_PRIVATE_KEY/PUBLIC_KEY unset".into(),
        ));
    };

    Ok(SigningMaterial {
        mode: SigningMode::Biaslens,
        authority: secrets.repro_pack_signing_authority.clone().unwrap_or_else(|| "BiasLens".to_string()),
        key_id: secrets.repro_pack_signing_key_id.clone().unwrap_or_else(|| "default".to_string()),
        private_key_pem,
        public_key_pem,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_manifest(
    state: &AppState,
    evaluation_id: &str,
    ai_system_name: &str,
    provider: String,
    determinism_mode: DeterminismMode,
    seed_value: i64,
    achieved_level: Option<String>,
    parameters_used: &ParametersUsed,
    heuristic_types: &[HeuristicType],
    iteration_count: u32,
    overall_score: f64,
    zone_status: ZoneStatus,
    confidence_intervals: &HashMap<String, ConfidenceInterval>,
    per_iteration_results: &[PerIterationResult],
    evidence_reference_id: Option<String>,
    signing: &SigningMaterial,
) -> biaslens_repro::ReproPackManifest {
    use biaslens_repro::*;

    let now = Utc::now().to_rfc3339();
    let prompt_set = per_iteration_results
        .iter()
        .map(|r| PromptSetEntry {
            prompt_reference_id: r.reference_id.clone().unwrap_or_default(),
            test_case_id: r.test_case_id.clone(),
            iteration: r.iteration,
            heuristic_type: r.heuristic_type,
            captured_at: now.clone(),
        })
        .collect();

    let output_hashes = per_iteration_results
        .iter()
        .map(|r| OutputHashEntry {
            prompt_reference_id: r.reference_id.clone().unwrap_or_default(),
            test_case_id: r.test_case_id.clone(),
            iteration: r.iteration,
            sha256: r.output_hash.clone(),
        })
        .collect();

    ReproPackManifest {
        schema_version: SCHEMA_VERSION.to_string(),
        evaluation_run_id: evaluation_id.to_string(),
        detector_version: env!("CARGO_PKG_VERSION").to_string(),
        timestamps: Timestamps {
            started_at: now.clone(),
            aggregated_at: now.clone(),
            completed_at: now.clone(),
        },
        model_configuration: ModelConfiguration {
            ai_system_name: ai_system_name.to_string(),
            heuristic_types: heuristic_types.to_vec(),
            iteration_count,
            iterations_run: iteration_count,
            determinism_mode,
            seed_value,
            decoding_parameters: parameters_used.clone(),
        },
        test_suite: TestSuiteSummary {
            heuristics: heuristic_types.to_vec(),
            iterations: iteration_count,
            iterations_run: iteration_count,
        },
        prompt_set,
        output_hashes,
        aggregate_metrics: AggregateMetrics {
            overall_score,
            zone_status,
            confidence_intervals: confidence_intervals.clone(),
        },
        evidence_reference_id,
        replay_instructions: ReplayInstructions {
            test_suite: ReplayTestSuite {
                cases: heuristic_types.len() as u32,
                iterations: iteration_count,
                iterations_run: iteration_count,
            },
            model: ReplayModel {
                provider,
                model_name: state.config.model_defaults.model_name.clone(),
                sampling_parameters: parameters_used.clone(),
                determinism: DeterminismSummary {
                    mode: determinism_mode,
                    seed: seed_value,
                    achieved_level,
                },
            },
            detector: ReplayDetector {
                version: env!("CARGO_PKG_VERSION").to_string(),
                heuristics: heuristic_types.to_vec(),
            },
            evidence: None,
            metrics: None,
            replay_steps: vec!["re-run each prompt with the recorded seed and parameters".to_string()],
        },
        signing: SigningBlock {
            mode: signing.mode.clone(),
            authority: signing.authority.clone(),
            key_id: signing.key_id.clone(),
            public_key: signing.public_key_pem.clone(),
        },
    }
}
