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

//! Control-plane store contracts. The actual key/value + relational
//! control-plane database is treated as an external collaborator; this
//! module specifies only the rows the core reads and writes. [`memory`]
//! provides an in-process reference implementation good enough to drive the
//! orchestrator in tests and examples — production deployments back these
//! traits with a real database.

pub mod memory;

use crate::error::CoreError;
use crate::types::*;

/// Inserts are unconditional; updates are keyed by `id`. No locking is
/// required in-process since rows are only ever appended or replaced
/// wholesale by id, never merged.
pub trait EvaluationStore: Send + Sync {
    fn insert(&self, evaluation: Evaluation) -> Result<(), CoreError>;
    fn get(&self, id: &str) -> Result<Option<Evaluation>, CoreError>;
    /// Read-modify-write; `f` mutates the stored row in place.
    fn update<F: FnOnce(&mut Evaluation)>(&self, id: &str, f: F) -> Result<(), CoreError>;
    /// Cancellation poll: true iff the row's status is already `failed`.
    fn is_cancelled(&self, id: &str) -> Result<bool, CoreError>;
}

pub trait ProgressStore: Send + Sync {
    fn upsert(&self, progress: EvaluationProgress) -> Result<(), CoreError>;
    fn get(&self, evaluation_id: &str) -> Result<Option<EvaluationProgress>, CoreError>;
    fn delete(&self, evaluation_id: &str) -> Result<(), CoreError>;
}

pub trait FindingStore: Send + Sync {
    fn insert_all(&self, findings: Vec<HeuristicFinding>) -> Result<(), CoreError>;
    fn list(&self, evaluation_id: &str) -> Result<Vec<HeuristicFinding>, CoreError>;
}

pub trait RecommendationStore: Send + Sync {
    fn insert_all(&self, recommendations: Vec<Recommendation>) -> Result<(), CoreError>;
    fn list(&self, evaluation_id: &str) -> Result<Vec<Recommendation>, CoreError>;
}

pub trait EvidenceReferenceStore: Send + Sync {
    fn insert_all(&self, references: Vec<EvidenceReference>) -> Result<(), CoreError>;
    fn list(&self, evaluation_id: &str) -> Result<Vec<EvidenceReference>, CoreError>;
}

pub trait ReproPackStore: Send + Sync {
    fn insert(&self, pack: ReproPack) -> Result<(), CoreError>;
    fn get(&self, evaluation_run_id: &str) -> Result<Option<ReproPack>, CoreError>;
}

pub trait SigningKeyStore: Send + Sync {
    /// Active customer-scoped signing key for a team, if the team has
    /// opted into `signing_mode = customer`.
    fn customer_signing_material(
        &self,
        team_id: &str,
    ) -> Result<Option<SigningMaterial>, CoreError>;
}

pub trait EvidenceConfigStore: Send + Sync {
    fn get(&self, team_id: &str, storage_type: &str) -> Result<Option<EvidenceCollectionConfig>, CoreError>;
}
