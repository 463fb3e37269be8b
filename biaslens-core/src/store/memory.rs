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

//! In-process reference store, keyed by `DashMap` so process state can be
//! kept without a dedicated database.

use dashmap::DashMap;

use super::*;
use crate::error::CoreError;
use crate::types::*;

#[derive(Default)]
pub struct InMemoryStore {
    evaluations: DashMap<String, Evaluation>,
    progress: DashMap<String, EvaluationProgress>,
    findings: DashMap<String, Vec<HeuristicFinding>>,
    recommendations: DashMap<String, Vec<Recommendation>>,
    evidence_references: DashMap<String, Vec<EvidenceReference>>,
    repro_packs: DashMap<String, ReproPack>,
    signing_keys: DashMap<String, SigningMaterial>,
    evidence_configs: DashMap<(String, String), EvidenceCollectionConfig>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_customer_signing_material(&self, team_id: &str, material: SigningMaterial) {
        self.signing_keys.insert(team_id.to_string(), material);
    }

    pub fn set_evidence_config(&self, config: EvidenceCollectionConfig) {
        self.evidence_configs
            .insert((config.team_id.clone(), config.storage_type.clone()), config);
    }
}

impl EvaluationStore for InMemoryStore {
    fn insert(&self, evaluation: Evaluation) -> Result<(), CoreError> {
        self.evaluations.insert(evaluation.id.clone(), evaluation);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Evaluation>, CoreError> {
        Ok(self.evaluations.get(id).map(|e| e.clone()))
    }

    fn update<F: FnOnce(&mut Evaluation)>(&self, id: &str, f: F) -> Result<(), CoreError> {
        let mut entry = self
            .evaluations
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("evaluation {id}")))?;
        f(&mut entry);
        Ok(())
    }

    fn is_cancelled(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self
            .evaluations
            .get(id)
            .map(|e| e.status == EvaluationStatus::Failed)
            .unwrap_or(false))
    }
}

impl ProgressStore for InMemoryStore {
    fn upsert(&self, progress: EvaluationProgress) -> Result<(), CoreError> {
        self.progress.insert(progress.evaluation_id.clone(), progress);
        Ok(())
    }

    fn get(&self, evaluation_id: &str) -> Result<Option<EvaluationProgress>, CoreError> {
        Ok(self.progress.get(evaluation_id).map(|p| p.clone()))
    }

    fn delete(&self, evaluation_id: &str) -> Result<(), CoreError> {
        self.progress.remove(evaluation_id);
        Ok(())
    }
}

impl FindingStore for InMemoryStore {
    fn insert_all(&self, findings: Vec<HeuristicFinding>) -> Result<(), CoreError> {
        for finding in findings {
            self.findings
                .entry(finding.evaluation_id.clone())
                .or_default()
                .push(finding);
        }
        Ok(())
    }

    fn list(&self, evaluation_id: &str) -> Result<Vec<HeuristicFinding>, CoreError> {
        Ok(self
            .findings
            .get(evaluation_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}

impl RecommendationStore for InMemoryStore {
    fn insert_all(&self, recommendations: Vec<Recommendation>) -> Result<(), CoreError> {
        for rec in recommendations {
            self.recommendations
                .entry(rec.evaluation_id.clone())
                .or_default()
                .push(rec);
        }
        Ok(())
    }

    fn list(&self, evaluation_id: &str) -> Result<Vec<Recommendation>, CoreError> {
        Ok(self
            .recommendations
            .get(evaluation_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}

impl EvidenceReferenceStore for InMemoryStore {
    fn insert_all(&self, references: Vec<EvidenceReference>) -> Result<(), CoreError> {
        for reference in references {
            self.evidence_references
                .entry(reference.evaluation_id.clone())
                .or_default()
                .push(reference);
        }
        Ok(())
    }

    fn list(&self, evaluation_id: &str) -> Result<Vec<EvidenceReference>, CoreError> {
        Ok(self
            .evidence_references
            .get(evaluation_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}

impl ReproPackStore for InMemoryStore {
    fn insert(&self, pack: ReproPack) -> Result<(), CoreError> {
        self.repro_packs
            .insert(pack.evaluation_run_id.clone(), pack);
        Ok(())
    }

    fn get(&self, evaluation_run_id: &str) -> Result<Option<ReproPack>, CoreError> {
        Ok(self.repro_packs.get(evaluation_run_id).map(|p| p.clone()))
    }
}

impl SigningKeyStore for InMemoryStore {
    fn customer_signing_material(
        &self,
        team_id: &str,
    ) -> Result<Option<SigningMaterial>, CoreError> {
        Ok(self.signing_keys.get(team_id).map(|m| m.clone()))
    }
}

impl EvidenceConfigStore for InMemoryStore {
    fn get(
        &self,
        team_id: &str,
        storage_type: &str,
    ) -> Result<Option<EvidenceCollectionConfig>, CoreError> {
        Ok(self
            .evidence_configs
            .get(&(team_id.to_string(), storage_type.to_string()))
            .map(|c| c.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_evaluation() -> Evaluation {
        Evaluation {
            id: "eval-1".into(),
            user_id: "user-1".into(),
            team_id: "team-1".into(),
            ai_system_name: "demo".into(),
            heuristic_types: vec![HeuristicType::Anchoring],
            iteration_count: 10,
            status: EvaluationStatus::Running,
            determinism_mode: DeterminismMode::Standard,
            seed_value: 0,
            achieved_level: None,
            parameters_used: ParametersUsed {
                temperature: 0.7,
                top_p: 1.0,
                top_k: None,
                max_tokens: 256,
            },
            iterations_run: 0,
            overall_score: None,
            zone_status: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            completed_at: None,
            evidence_reference_id: None,
            evidence_storage_type: None,
            confidence_intervals: Default::default(),
            per_iteration_results: vec![],
            failure_message: None,
        }
    }

    #[test]
    fn insert_and_get_round_trips() {
        let store = InMemoryStore::new();
        store.insert(sample_evaluation()).unwrap();
        let fetched = store.get("eval-1").unwrap().unwrap();
        assert_eq!(fetched.ai_system_name, "demo");
    }

    #[test]
    fn update_mutates_in_place() {
        let store = InMemoryStore::new();
        store.insert(sample_evaluation()).unwrap();
        store
            .update("eval-1", |e| e.status = EvaluationStatus::Failed)
            .unwrap();
        assert!(store.is_cancelled("eval-1").unwrap());
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());
    }
}
