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

//! The reproducibility manifest shape. Field order in these structs is
//! irrelevant to the content hash — [`biaslens_crypto::canon`] normalizes
//! key order before hashing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use biaslens_core::{ConfidenceInterval, DeterminismMode, HeuristicType, ParametersUsed, SigningMode, ZoneStatus};

pub const SCHEMA_VERSION: &str = "1.2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamps {
    pub started_at: String,
    pub aggregated_at: String,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfiguration {
    pub ai_system_name: String,
    pub heuristic_types: Vec<HeuristicType>,
    pub iteration_count: u32,
    pub iterations_run: u32,
    pub determinism_mode: DeterminismMode,
    pub seed_value: i64,
    pub decoding_parameters: ParametersUsed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteSummary {
    pub heuristics: Vec<HeuristicType>,
    pub iterations: u32,
    pub iterations_run: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSetEntry {
    pub prompt_reference_id: String,
    pub test_case_id: String,
    pub iteration: u32,
    pub heuristic_type: HeuristicType,
    pub captured_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputHashEntry {
    pub prompt_reference_id: String,
    pub test_case_id: String,
    pub iteration: u32,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub overall_score: f64,
    pub zone_status: ZoneStatus,
    pub confidence_intervals: HashMap<String, ConfidenceInterval>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismSummary {
    pub mode: DeterminismMode,
    pub seed: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayModel {
    pub provider: String,
    pub model_name: String,
    pub sampling_parameters: ParametersUsed,
    pub determinism: DeterminismSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDetector {
    pub version: String,
    pub heuristics: Vec<HeuristicType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEvidence {
    pub reference_id: String,
    pub storage_type: String,
    pub link_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayMetrics {
    pub confidence_intervals: HashMap<String, ConfidenceInterval>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayTestSuite {
    pub cases: u32,
    pub iterations: u32,
    pub iterations_run: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayInstructions {
    pub test_suite: ReplayTestSuite,
    pub model: ReplayModel,
    pub detector: ReplayDetector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<ReplayEvidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ReplayMetrics>,
    pub replay_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningBlock {
    pub mode: SigningMode,
    pub authority: String,
    pub key_id: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproPackManifest {
    pub schema_version: String,
    pub evaluation_run_id: String,
    pub detector_version: String,
    pub timestamps: Timestamps,
    pub model_configuration: ModelConfiguration,
    pub test_suite: TestSuiteSummary,
    pub prompt_set: Vec<PromptSetEntry>,
    pub output_hashes: Vec<OutputHashEntry>,
    pub aggregate_metrics: AggregateMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_reference_id: Option<String>,
    pub replay_instructions: ReplayInstructions,
    pub signing: SigningBlock,
}
