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

//! End-to-end scenarios for the evaluation pipeline, exercised through the
//! real axum router (`tower::ServiceExt::oneshot`) wherever the scenario
//! only needs the bundled `SimulatedModelClient`, and through
//! `orchestrator::intake` directly where the scenario hinges on a
//! no-seed-support provider and asserting against a live third-party API
//! would make the suite network-dependent.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::{Extension, Router};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use tower::ServiceExt;

use biaslens_core::store::memory::InMemoryStore;
use biaslens_core::store::{EvaluationStore, FindingStore, ProgressStore, ReproPackStore};
use biaslens_core::{
    CapturedEvidence, DeterministicRequest, DeterminismLevel, DeterminismMode, EvaluationRequest, EvaluationStatus,
    EvidenceCollectionConfig, HeuristicType, ParametersUsed, ZoneStatus,
};
use biaslens_evidence::{EvidenceBatchShipper, MockBackend, ShipMode};
use biaslens_server::api;
use biaslens_server::auth::{auth_middleware, Authenticator, NoAuth};
use biaslens_server::config::ServerConfig;
use biaslens_server::orchestrator;
use biaslens_server::state::AppState;

const TEAM_ID: &str = "team-test";

fn signing_keypair() -> (String, String) {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = RsaPublicKey::from(&private_key);
    (
        private_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
        public_key.to_public_key_pem(LineEnding::LF).unwrap(),
    )
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    let (private_key_pem, public_key_pem) = signing_keypair();
    config.secrets.repro_pack_signing_private_key = Some(private_key_pem);
    config.secrets.repro_pack_signing_public_key = Some(public_key_pem);
    config
}

fn test_app(config: ServerConfig) -> (Router, AppState) {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(store, config);
    let authenticator: Arc<dyn Authenticator> = Arc::new(NoAuth::new(TEAM_ID));

    let authed_routes = Router::new()
        .route("/evaluate", post(api::create_evaluation))
        .route("/evaluate/:id", get(api::get_evaluation))
        .route("/evaluations/:id/progress", get(api::get_progress))
        .route("/verify-repro-pack", post(api::verify_repro_pack_handler))
        .layer(axum_middleware::from_fn(auth_middleware))
        .layer(Extension(authenticator));

    let app = Router::new()
        .route("/healthz", get(api::health_check))
        .merge(authed_routes)
        .with_state(state.clone());

    (app, state)
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is valid JSON")
    };
    (status, body)
}

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

/// Polls the store directly rather than the HTTP progress endpoint: the
/// background task mutates the row through the same `InMemoryStore` handle,
/// so this avoids coupling the wait loop to the response envelope shape.
async fn wait_for_terminal_status(state: &AppState, evaluation_id: &str) -> biaslens_core::Evaluation {
    for _ in 0..500 {
        if let Some(evaluation) = EvaluationStore::get(&state.store, evaluation_id).unwrap() {
            if evaluation.status != EvaluationStatus::Running {
                return evaluation;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("evaluation {evaluation_id} did not reach a terminal status in time");
}

fn evaluation_request(ai_system_name: &str, heuristics: Vec<HeuristicType>, iterations: u32) -> Value {
    json!({
        "ai_system_name": ai_system_name,
        "heuristic_types": heuristics,
        "iteration_count": iterations,
    })
}

/// S1: happy path against the bundled simulator. One finding whose
/// `test_cases_run` equals the fixed anchoring catalog size (5), a score in
/// range, and a repro pack whose recomputed hash matches the stored one.
#[tokio::test]
async fn s1_happy_path_with_simulator_completes_and_produces_a_verifiable_pack() {
    let (app, state) = test_app(test_config());

    let (status, body) = post_json(
        &app,
        "/evaluate",
        evaluation_request("demo", vec![HeuristicType::Anchoring], 10),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let evaluation_id = body["evaluation"]["id"].as_str().unwrap().to_string();

    let evaluation = wait_for_terminal_status(&state, &evaluation_id).await;
    assert_eq!(evaluation.status, EvaluationStatus::Completed);
    let overall_score = evaluation.overall_score.expect("completed evaluation has a score");
    assert!((0.0..=100.0).contains(&overall_score));
    assert_eq!(evaluation.zone_status, Some(ZoneStatus::from_score(overall_score)));

    let findings = FindingStore::list(&state.store, &evaluation_id).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].test_cases_run, 5, "anchoring catalog has 5 fixed test cases");

    let pack = ReproPackStore::get(&state.store, &evaluation_id)
        .unwrap()
        .expect("background task persists a repro pack on completion");
    let recomputed = biaslens_crypto::canonical_hash_of(&pack.repro_pack_content).unwrap();
    assert_eq!(recomputed, pack.content_hash);

    let (status, body) = get_json(&app, &format!("/evaluate/{evaluation_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evaluation"]["status"], "completed");
    assert!(body["trends"]["data_points"].is_array());
}

/// S2: a provider with no seed support and fallback disabled is rejected
/// before any evaluation row is created.
#[tokio::test]
async fn s2_determinism_refusal_rejects_before_creating_a_row() {
    let mut config = test_config();
    config.llm.anthropic_api_key = Some("unused-in-this-test".to_string());
    let (app, _state) = test_app(config);

    let mut request = evaluation_request("demo", vec![HeuristicType::Anchoring], 10);
    request["llm_config_id"] = json!("anthropic");
    request["deterministic"] = json!({
        "enabled": true,
        "level": "full",
        "allow_nondeterministic_fallback": false,
    });

    let (status, body) = post_json(&app, "/evaluate", request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not support deterministic evaluation"));
}

/// S3: same request with fallback allowed downgrades to `standard` instead
/// of being rejected. Verified against `orchestrator::intake` directly —
/// `anthropic` has no seed support by design, so letting the background
/// task run to completion would require a live network call to a real
/// provider, which this offline suite does not make.
#[tokio::test]
async fn s3_fallback_accepted_downgrades_to_standard() {
    let mut config = test_config();
    config.llm.anthropic_api_key = Some("unused-in-this-test".to_string());
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(store, config);

    let request = EvaluationRequest {
        ai_system_name: "demo".to_string(),
        heuristic_types: vec![HeuristicType::Anchoring],
        iteration_count: 10,
        llm_config_id: Some("anthropic".to_string()),
        deterministic: Some(DeterministicRequest {
            enabled: true,
            level: DeterminismLevel::Full,
            seed: None,
            allow_nondeterministic_fallback: true,
            temperature: None,
            keep_temperature_constant: false,
        }),
    };

    let envelope = orchestrator::intake(&state, TEAM_ID, None, request).expect("fallback is accepted, not rejected");
    assert_eq!(envelope.evaluation.determinism_mode, DeterminismMode::Standard);
    assert_eq!(envelope.evaluation.achieved_level.as_deref(), Some("standard:no_seed_support"));
}

/// S4: a corrupted credential envelope degrades evidence collection to
/// disabled rather than failing the evaluation.
#[tokio::test]
async fn s4_evidence_disabled_on_decrypt_error() {
    let mut config = test_config();
    config.evidence.default_storage_type = Some("mock".to_string());
    config.secrets.api_key_encryption_secret = Some("test-encryption-secret".to_string());
    let (app, state) = test_app(config);

    state.store.set_evidence_config(EvidenceCollectionConfig {
        team_id: TEAM_ID.to_string(),
        storage_type: "mock".to_string(),
        is_enabled: true,
        credentials_encrypted: "not valid base64 envelope!!".to_string(),
        configuration: Default::default(),
        last_tested_at: None,
    });

    let (status, body) = post_json(
        &app,
        "/evaluate",
        evaluation_request("demo", vec![HeuristicType::Anchoring], 10),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let evaluation_id = body["evaluation"]["id"].as_str().unwrap().to_string();

    let evaluation = wait_for_terminal_status(&state, &evaluation_id).await;
    assert_eq!(evaluation.status, EvaluationStatus::Completed);
    assert!(evaluation.evidence_reference_id.is_none());
    assert!(evaluation.evidence_storage_type.is_none());
}

/// S5: a backend that always returns 429 still lets the evaluation reach
/// `completed`, with nothing successfully shipped.
#[tokio::test]
async fn s5_rate_limited_backend_still_completes_with_no_shipped_evidence() {
    let mut config = test_config();
    config.evidence.default_storage_type = Some("mock".to_string());
    let secret = "test-encryption-secret".to_string();
    config.secrets.api_key_encryption_secret = Some(secret.clone());
    let (app, state) = test_app(config);

    let credential = json!({"storage_type": "mock", "rate_limited": "true"});
    let envelope = biaslens_crypto::encrypt(&secret, serde_json::to_vec(&credential).unwrap().as_slice()).unwrap();

    state.store.set_evidence_config(EvidenceCollectionConfig {
        team_id: TEAM_ID.to_string(),
        storage_type: "mock".to_string(),
        is_enabled: true,
        credentials_encrypted: envelope,
        configuration: Default::default(),
        last_tested_at: None,
    });

    let (status, body) = post_json(
        &app,
        "/evaluate",
        evaluation_request("demo", vec![HeuristicType::Anchoring], 10),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let evaluation_id = body["evaluation"]["id"].as_str().unwrap().to_string();

    let evaluation = wait_for_terminal_status(&state, &evaluation_id).await;
    assert_eq!(evaluation.status, EvaluationStatus::Completed);
    assert!(evaluation.evidence_reference_id.is_none(), "nothing shipped, so no reference is minted");

    // The evaluation row itself carries no rate-limit telemetry (it's
    // control-plane state, not evidence-shipping internals), so drive the
    // same always-rate-limited backend directly through the shipper to
    // observe `rateLimitEncountered` per spec §4.7 step 3 / scenario S5.
    let backend = Arc::new(MockBackend::new().with_always_rate_limited(true));
    let shipper = EvidenceBatchShipper::new(backend);
    let items = vec![CapturedEvidence {
        prompt: "prompt".to_string(),
        output: "output".to_string(),
        test_case_id: "case-1".to_string(),
        iteration: 1,
        timestamp_us: 0,
        heuristic_type: HeuristicType::Anchoring,
        reference_id: "evaluation-run-run-1-test-case-case-1-iteration-1-uuid".to_string(),
    }];
    let result = shipper
        .ship_all(
            "run-1",
            DeterminismMode::Standard,
            0,
            1,
            None,
            &ParametersUsed {
                temperature: 0.7,
                top_p: 1.0,
                top_k: None,
                max_tokens: 256,
            },
            &[],
            items,
            ShipMode::Sync,
        )
        .await;
    assert!(result.rate_limit_encountered, "every attempt hit the permanent rate limit");
    assert!(result.consecutive_rate_limit_errors > 0);
    assert_eq!(result.shipped_count, 0);
}

/// S6: flipping the row to `failed` mid-run stops the background task
/// before it persists any findings, since findings are only written once,
/// after the heuristic loop runs to normal completion. The cancellation
/// check is identical at every loop iteration, so failing the row before
/// the task starts exercises the same early-return path a mid-run flip
/// would hit, without a timing-dependent race against a simulator that
/// answers faster than the test can interject.
#[tokio::test]
async fn s6_cancellation_mid_run_persists_no_findings() {
    let config = test_config();
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(store, config);

    let request = EvaluationRequest {
        ai_system_name: "demo".to_string(),
        heuristic_types: vec![
            HeuristicType::Anchoring,
            HeuristicType::LossAversion,
            HeuristicType::SunkCost,
            HeuristicType::ConfirmationBias,
            HeuristicType::AvailabilityHeuristic,
        ],
        iteration_count: 10,
        llm_config_id: None,
        deterministic: None,
    };

    let envelope = orchestrator::intake(&state, TEAM_ID, None, request).unwrap();
    let evaluation_id = envelope.evaluation.id.clone();

    state
        .store
        .update(&evaluation_id, |e| e.status = EvaluationStatus::Failed)
        .unwrap();

    orchestrator::run_background(
        state.clone(),
        evaluation_id.clone(),
        envelope.evaluation.team_id.clone(),
        envelope.evaluation.ai_system_name.clone(),
        envelope.provider,
        envelope.model_client,
        envelope.evaluation.parameters_used.clone(),
        envelope.evaluation.determinism_mode,
        envelope.evaluation.seed_value,
        envelope.evaluation.achieved_level.clone(),
        envelope.evaluation.heuristic_types.clone(),
        envelope.evaluation.iteration_count,
    )
    .await;

    let evaluation = EvaluationStore::get(&state.store, &evaluation_id).unwrap().unwrap();
    assert_eq!(evaluation.status, EvaluationStatus::Failed);
    let findings = FindingStore::list(&state.store, &evaluation_id).unwrap();
    assert!(findings.is_empty(), "cancellation short-circuits before findings are ever inserted");
    assert!(ReproPackStore::get(&state.store, &evaluation_id).unwrap().is_none());
}
