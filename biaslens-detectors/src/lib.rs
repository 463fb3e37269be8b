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

//! # BiasLens Detectors
//!
//! Per-heuristic test-case catalogs, prompt generation, scoring,
//! statistical aggregation and recommendation selection.

pub mod detector;
pub mod error;
pub mod recommendations;
pub mod scoring;
pub mod test_cases;

pub use detector::{
    detector_for, AnchoringDetector, AvailabilityDetector, ConfirmationBiasDetector, Detector,
    DetectorContext, DetectorOutcome, LossAversionDetector, SunkCostDetector,
};
pub use error::DetectorError;
pub use recommendations::build_recommendations;
pub use scoring::{aggregate, BiasScorer, KeywordHeuristicScorer, ScoreAggregate};
pub use test_cases::{catalog_for, Difficulty, TestCase};
