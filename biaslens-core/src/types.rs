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

//! Entity types for the evaluation run lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;

/// One of the five cognitive-bias categories a run can test for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicType {
    Anchoring,
    LossAversion,
    SunkCost,
    ConfirmationBias,
    AvailabilityHeuristic,
}

impl HeuristicType {
    pub const ALL: [HeuristicType; 5] = [
        HeuristicType::Anchoring,
        HeuristicType::LossAversion,
        HeuristicType::SunkCost,
        HeuristicType::ConfirmationBias,
        HeuristicType::AvailabilityHeuristic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeuristicType::Anchoring => "anchoring",
            HeuristicType::LossAversion => "loss_aversion",
            HeuristicType::SunkCost => "sunk_cost",
            HeuristicType::ConfirmationBias => "confirmation_bias",
            HeuristicType::AvailabilityHeuristic => "availability_heuristic",
        }
    }
}

impl fmt::Display for HeuristicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested strictness of reproducibility, as submitted on intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminismLevel {
    Full,
    Near,
    Adaptive,
}

/// The `determinismMode` actually recorded on the `Evaluation` row — may
/// differ from the requested `DeterminismLevel` after provider-capability
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminismMode {
    Standard,
    Full,
    Near,
    Adaptive,
}

impl DeterminismMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeterminismMode::Standard => "standard",
            DeterminismMode::Full => "full",
            DeterminismMode::Near => "near",
            DeterminismMode::Adaptive => "adaptive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicRequest {
    pub enabled: bool,
    pub level: DeterminismLevel,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub allow_nondeterministic_fallback: bool,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub keep_temperature_constant: bool,
}

/// Inbound job-submission payload (`POST /evaluate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub ai_system_name: String,
    pub heuristic_types: Vec<HeuristicType>,
    pub iteration_count: u32,
    #[serde(default)]
    pub llm_config_id: Option<String>,
    #[serde(default)]
    pub deterministic: Option<DeterministicRequest>,
}

impl EvaluationRequest {
    /// Schema validation. Invalid requests are rejected before any state is
    /// created.
    pub fn validate(&self) -> Result<(), CoreError> {
        let len = self.ai_system_name.chars().count();
        if len == 0 || len > 255 {
            return Err(CoreError::Invalid(
                "aiSystemName must be 1-255 characters".into(),
            ));
        }
        if self.heuristic_types.is_empty() || self.heuristic_types.len() > 10 {
            return Err(CoreError::Invalid(
                "heuristicTypes must be non-empty and at most 10 entries".into(),
            ));
        }
        if !(10..=1000).contains(&self.iteration_count) {
            return Err(CoreError::Invalid(
                "iterationCount must be between 10 and 1000".into(),
            ));
        }
        if let Some(det) = &self.deterministic {
            if let Some(temp) = det.temperature {
                if !(0.0..=2.0).contains(&temp) {
                    return Err(CoreError::Invalid(
                        "deterministic.temperature must be between 0.0 and 2.0".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::Running => "running",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Green,
    Yellow,
    Red,
}

impl ZoneStatus {
    /// Green `<= 80`, yellow `<= 90`, red above that.
    pub fn from_score(overall_score: f64) -> Self {
        if overall_score <= 80.0 {
            ZoneStatus::Green
        } else if overall_score <= 90.0 {
            ZoneStatus::Yellow
        } else {
            ZoneStatus::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneStatus::Green => "green",
            ZoneStatus::Yellow => "yellow",
            ZoneStatus::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersUsed {
    pub temperature: f64,
    pub top_p: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lo: f64,
    pub hi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerIterationResult {
    pub test_case_id: String,
    pub iteration: u32,
    pub heuristic_type: HeuristicType,
    pub score: f64,
    pub output_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

/// The evaluation row. State machine: `pending -> running -> {completed |
/// failed}`; `failed` is also the cancellation terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    pub ai_system_name: String,
    pub heuristic_types: Vec<HeuristicType>,
    pub iteration_count: u32,
    pub status: EvaluationStatus,
    pub determinism_mode: DeterminismMode,
    pub seed_value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_level: Option<String>,
    pub parameters_used: ParametersUsed,
    pub iterations_run: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_status: Option<ZoneStatus>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_storage_type: Option<String>,
    #[serde(default)]
    pub confidence_intervals: HashMap<String, ConfidenceInterval>,
    #[serde(default)]
    pub per_iteration_results: Vec<PerIterationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Initializing,
    Detecting,
    StoringEvidence,
    Processing,
    Finalizing,
    Completed,
    Failed,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Initializing => "initializing",
            ProgressPhase::Detecting => "detecting",
            ProgressPhase::StoringEvidence => "storing_evidence",
            ProgressPhase::Processing => "processing",
            ProgressPhase::Finalizing => "finalizing",
            ProgressPhase::Completed => "completed",
            ProgressPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationProgress {
    pub id: String,
    pub evaluation_id: String,
    pub progress_percent: u8,
    pub current_phase: ProgressPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_heuristic: Option<HeuristicType>,
    pub tests_completed: u32,
    pub tests_total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicFinding {
    pub evaluation_id: String,
    pub heuristic_type: HeuristicType,
    pub severity: Severity,
    pub severity_score: f64,
    pub confidence_level: f64,
    pub detection_count: u32,
    pub example_instances: Vec<String>,
    pub pattern_description: String,
    pub test_cases_run: u32,
    pub mean_bias_score: f64,
    pub std_deviation: f64,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedImpact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationDifficulty {
    Easy,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub evaluation_id: String,
    pub heuristic_type: HeuristicType,
    pub priority: u8,
    pub action_title: String,
    pub technical_description: String,
    pub simplified_description: String,
    pub estimated_impact: EstimatedImpact,
    pub implementation_difficulty: ImplementationDifficulty,
}

/// In-memory only — never persisted to the control plane.
#[derive(Debug, Clone)]
pub struct CapturedEvidence {
    pub prompt: String,
    pub output: String,
    pub test_case_id: String,
    pub iteration: u32,
    pub timestamp_us: u64,
    pub heuristic_type: HeuristicType,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceReference {
    pub evaluation_id: String,
    pub test_case_id: String,
    pub reference_id: String,
    pub storage_location: String,
    pub storage_type: String,
    pub determinism_mode: DeterminismMode,
    pub seed_value: i64,
    pub iterations_run: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_level: Option<String>,
    pub parameters_used: ParametersUsed,
    pub confidence_intervals: HashMap<String, ConfidenceInterval>,
    pub per_iteration_results: Vec<PerIterationResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceCollectionConfig {
    pub team_id: String,
    pub storage_type: String,
    pub is_enabled: bool,
    pub credentials_encrypted: String,
    pub configuration: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tested_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    Biaslens,
    Customer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningMaterial {
    pub mode: SigningMode,
    pub authority: String,
    pub key_id: String,
    pub private_key_pem: String,
    pub public_key_pem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproPack {
    pub evaluation_run_id: String,
    pub content_hash: String,
    pub signature: String,
    pub signing_authority: String,
    pub signing_key_id: String,
    pub created_at: String,
    pub repro_pack_content: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> EvaluationRequest {
        EvaluationRequest {
            ai_system_name: "demo".into(),
            heuristic_types: vec![HeuristicType::Anchoring],
            iteration_count: 10,
            llm_config_id: None,
            deterministic: None,
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let mut req = valid_request();
        req.ai_system_name = "".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_iterations() {
        let mut req = valid_request();
        req.iteration_count = 9;
        assert!(req.validate().is_err());
        req.iteration_count = 1001;
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_empty_heuristics() {
        let mut req = valid_request();
        req.heuristic_types = vec![];
        assert!(req.validate().is_err());
    }

    #[test]
    fn zone_boundaries_match_spec() {
        assert_eq!(ZoneStatus::from_score(0.0), ZoneStatus::Green);
        assert_eq!(ZoneStatus::from_score(80.0), ZoneStatus::Green);
        assert_eq!(ZoneStatus::from_score(80.01), ZoneStatus::Yellow);
        assert_eq!(ZoneStatus::from_score(90.0), ZoneStatus::Yellow);
        assert_eq!(ZoneStatus::from_score(90.01), ZoneStatus::Red);
        assert_eq!(ZoneStatus::from_score(100.0), ZoneStatus::Red);
    }
}
