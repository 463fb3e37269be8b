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

//! `POST /evaluate` and `GET /evaluate/{id}`.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use biaslens_core::store::{EvaluationStore, FindingStore, ProgressStore, RecommendationStore};
use biaslens_core::{HeuristicFinding, Recommendation, ZoneStatus};

use crate::auth::AuthContext;
use crate::error::OrchestratorError;
use crate::orchestrator;
use crate::state::AppState;

pub async fn create_evaluation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<biaslens_core::EvaluationRequest>,
) -> Result<Json<Value>, OrchestratorError> {
    let envelope = orchestrator::intake(&state, &auth.team_id, auth.user_id.as_deref(), request)?;
    let evaluation = envelope.evaluation;
    let progress_filter = format!("evaluation_id=eq.{}", evaluation.id);

    tokio::spawn(orchestrator::run_background(
        state.clone(),
        evaluation.id.clone(),
        evaluation.team_id.clone(),
        evaluation.ai_system_name.clone(),
        envelope.provider,
        envelope.model_client,
        evaluation.parameters_used.clone(),
        evaluation.determinism_mode,
        evaluation.seed_value,
        evaluation.achieved_level.clone(),
        evaluation.heuristic_types.clone(),
        evaluation.iteration_count,
    ));

    Ok(Json(json!({
        "evaluation": {
            "id": evaluation.id,
            "ai_system_name": evaluation.ai_system_name,
            "heuristic_types": evaluation.heuristic_types,
            "iteration_count": evaluation.iteration_count,
            "status": evaluation.status,
            "created_at": evaluation.created_at,
            "determinism_mode": evaluation.determinism_mode,
            "seed_value": evaluation.seed_value,
            "parameters_used": evaluation.parameters_used,
        },
        "message": "Evaluation started",
        "progress_subscription": {
            "table": "evaluation_progress",
            "filter": progress_filter,
        },
    })))
}

/// Trend data over a single run's own per-iteration scores. The reference
/// store has no query to enumerate prior evaluations for the same
/// `aiSystemName`, so cross-run drift detection (the richer reading of the
/// `trends` field) is out of reach here; see `DESIGN.md`.
fn trends_for(evaluation: &biaslens_core::Evaluation) -> Value {
    let data_points: Vec<Value> = evaluation
        .per_iteration_results
        .iter()
        .map(|r| {
            json!({
                "iteration": r.iteration,
                "heuristic_type": r.heuristic_type,
                "score": r.score,
            })
        })
        .collect();

    let current_zone = evaluation.zone_status.unwrap_or(ZoneStatus::Green);

    json!({
        "data_points": data_points,
        "current_zone": current_zone,
        "drift_alert": false,
        "drift_message": "no prior runs available for this AI system in the reference store",
    })
}

pub async fn get_evaluation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OrchestratorError> {
    let evaluation = EvaluationStore::get(&state.store, &id)?
        .ok_or_else(|| OrchestratorError::NotFound(format!("evaluation {id} not found")))?;

    if evaluation.team_id != auth.team_id {
        return Err(OrchestratorError::NotFound(format!("evaluation {id} not found")));
    }

    let findings: Vec<HeuristicFinding> = FindingStore::list(&state.store, &id)?;
    let recommendations: Vec<Recommendation> = RecommendationStore::list(&state.store, &id)?;
    let trends = trends_for(&evaluation);

    Ok(Json(json!({
        "evaluation": evaluation,
        "findings": findings,
        "recommendations": recommendations,
        "trends": trends,
    })))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OrchestratorError> {
    let evaluation = EvaluationStore::get(&state.store, &id)?
        .ok_or_else(|| OrchestratorError::NotFound(format!("evaluation {id} not found")))?;
    if evaluation.team_id != auth.team_id {
        return Err(OrchestratorError::NotFound(format!("evaluation {id} not found")));
    }

    let progress = ProgressStore::get(&state.store, &id)?;
    Ok(Json(json!({ "progress": progress })))
}
