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

//! Recommendation templates and prioritization.
//!
//! Human-facing recommendation templates are treated as static data
//! supplied by an external collaborator; the code here only selects and
//! prioritizes them. [`templates_for`] is the small fixed placeholder
//! catalog this workspace ships so the pipeline is runnable end to end —
//! production deployments swap in richer, localized template content
//! behind the same selection/prioritization logic.

use biaslens_core::{
    EstimatedImpact, HeuristicFinding, HeuristicType, ImplementationDifficulty, Recommendation,
};

struct Template {
    action_title: &'static str,
    technical_description: &'static str,
    simplified_description: &'static str,
    estimated_impact: EstimatedImpact,
    implementation_difficulty: ImplementationDifficulty,
}

fn impact_score(impact: EstimatedImpact) -> f64 {
    match impact {
        EstimatedImpact::Low => 25.0,
        EstimatedImpact::Medium => 60.0,
        EstimatedImpact::High => 95.0,
    }
}

fn templates_for(heuristic: HeuristicType) -> Vec<Template> {
    match heuristic {
        HeuristicType::Anchoring => vec![
            Template {
                action_title: "Randomize or omit numeric seeds in prompts",
                technical_description: "Strip or shuffle incidental numeric values from system and user prompts so the model has no irrelevant anchor to latch onto before producing an estimate.",
                simplified_description: "Remove stray numbers from prompts before asking the model to estimate something.",
                estimated_impact: EstimatedImpact::High,
                implementation_difficulty: ImplementationDifficulty::Easy,
            },
            Template {
                action_title: "Request multiple independent estimates and aggregate",
                technical_description: "Sample several independent completions with varied or absent anchors and aggregate (e.g. median) to dilute any single anchor's influence.",
                simplified_description: "Ask the model the same question several different ways and average the answers.",
                estimated_impact: EstimatedImpact::Medium,
                implementation_difficulty: ImplementationDifficulty::Moderate,
            },
        ],
        HeuristicType::LossAversion => vec![
            Template {
                action_title: "Present outcomes in both gain and loss frames",
                technical_description: "When eliciting a recommendation, supply the decision in both a gain-framed and loss-framed version and require the model to reconcile them before answering.",
                simplified_description: "Ask the model to consider the same choice from a 'what you gain' and 'what you lose' angle.",
                estimated_impact: EstimatedImpact::High,
                implementation_difficulty: ImplementationDifficulty::Moderate,
            },
            Template {
                action_title: "Require explicit expected-value computation",
                technical_description: "Prompt the model to compute expected value explicitly before giving a recommendation, reducing reliance on framing-driven intuition.",
                simplified_description: "Have the model show its math before recommending a choice.",
                estimated_impact: EstimatedImpact::Medium,
                implementation_difficulty: ImplementationDifficulty::Easy,
            },
        ],
        HeuristicType::SunkCost => vec![
            Template {
                action_title: "Exclude historical investment from the decision prompt",
                technical_description: "Reframe continuation decisions around forward-looking costs and benefits only; omit or explicitly discount prior investment figures from the prompt context.",
                simplified_description: "Ask about the decision going forward without mentioning how much has already been spent.",
                estimated_impact: EstimatedImpact::High,
                implementation_difficulty: ImplementationDifficulty::Easy,
            },
            Template {
                action_title: "Add an explicit 'ignore sunk costs' instruction",
                technical_description: "Include a system-level instruction directing the model to evaluate continuation decisions solely on marginal future costs and benefits.",
                simplified_description: "Tell the model directly to ignore money or time already spent.",
                estimated_impact: EstimatedImpact::Medium,
                implementation_difficulty: ImplementationDifficulty::Easy,
            },
        ],
        HeuristicType::ConfirmationBias => vec![
            Template {
                action_title: "Require balanced evidence by default",
                technical_description: "Add a system instruction requiring the model to present evidence for and against a stated belief whenever asked to evaluate a claim.",
                simplified_description: "Make the model always give both sides of an argument, not just the side you already believe.",
                estimated_impact: EstimatedImpact::High,
                implementation_difficulty: ImplementationDifficulty::Easy,
            },
            Template {
                action_title: "Run an adversarial second pass",
                technical_description: "After the model produces supporting evidence, run a second pass explicitly asking it to argue the opposite position and surface both outputs.",
                simplified_description: "Ask the model to argue against itself after it gives an answer.",
                estimated_impact: EstimatedImpact::Medium,
                implementation_difficulty: ImplementationDifficulty::Complex,
            },
        ],
        HeuristicType::AvailabilityHeuristic => vec![
            Template {
                action_title: "Ground risk estimates in base-rate data",
                technical_description: "Require the model to cite base-rate statistics before answering questions about risk or likelihood, rather than relying on recently salient examples.",
                simplified_description: "Have the model look up real statistics instead of going off a recent news story.",
                estimated_impact: EstimatedImpact::High,
                implementation_difficulty: ImplementationDifficulty::Moderate,
            },
            Template {
                action_title: "Strip recency cues from prompts",
                technical_description: "Remove phrases like 'recently', 'just heard', or references to trending topics from prompts that ask for a risk or likelihood assessment.",
                simplified_description: "Avoid mentioning recent news when asking the model to judge how risky something is.",
                estimated_impact: EstimatedImpact::Medium,
                implementation_difficulty: ImplementationDifficulty::Easy,
            },
        ],
    }
}

/// Weighted priority score from severity, confidence and estimated impact,
/// clamped to `[1, 10]`.
fn priority_for(severity_score: f64, confidence: f64, impact: f64) -> u8 {
    let raw = (0.6 * severity_score + 30.0 * confidence + 0.1 * impact) / 100.0 * 9.0;
    let priority = raw.floor() as i32 + 1;
    priority.clamp(1, 10) as u8
}

/// Builds recommendations for every finding's templates, then keeps the
/// top 7 by priority across the whole evaluation.
pub fn build_recommendations(
    evaluation_id: &str,
    findings: &[HeuristicFinding],
) -> Vec<Recommendation> {
    let mut candidates: Vec<Recommendation> = Vec::new();

    for finding in findings {
        for template in templates_for(finding.heuristic_type) {
            let priority = priority_for(
                finding.severity_score,
                finding.confidence_level,
                impact_score(template.estimated_impact),
            );
            candidates.push(Recommendation {
                evaluation_id: evaluation_id.to_string(),
                heuristic_type: finding.heuristic_type,
                priority,
                action_title: template.action_title.to_string(),
                technical_description: template.technical_description.to_string(),
                simplified_description: template.simplified_description.to_string(),
                estimated_impact: template.estimated_impact,
                implementation_difficulty: template.implementation_difficulty,
            });
        }
    }

    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates.truncate(7);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use biaslens_core::{ConfidenceInterval, Severity};

    fn finding(heuristic: HeuristicType, severity_score: f64, confidence: f64) -> HeuristicFinding {
        HeuristicFinding {
            evaluation_id: "eval-1".into(),
            heuristic_type: heuristic,
            severity: Severity::High,
            severity_score,
            confidence_level: confidence,
            detection_count: 3,
            example_instances: vec![],
            pattern_description: "test".into(),
            test_cases_run: 5,
            mean_bias_score: 2.5,
            std_deviation: 0.5,
            confidence_interval: ConfidenceInterval { lo: 2.0, hi: 3.0 },
        }
    }

    #[test]
    fn caps_at_seven_recommendations() {
        let findings: Vec<HeuristicFinding> = HeuristicType::ALL
            .iter()
            .map(|h| finding(*h, 80.0, 0.9))
            .collect();
        let recs = build_recommendations("eval-1", &findings);
        assert!(recs.len() <= 7);
    }

    #[test]
    fn priority_is_clamped_to_valid_range() {
        for severity in [0.0, 25.0, 50.0, 75.0, 100.0] {
            for confidence in [0.0, 0.5, 0.99] {
                let p = priority_for(severity, confidence, 95.0);
                assert!((1..=10).contains(&p));
            }
        }
    }

    #[test]
    fn recommendations_sorted_descending_by_priority() {
        let findings = vec![
            finding(HeuristicType::Anchoring, 10.0, 0.1),
            finding(HeuristicType::SunkCost, 95.0, 0.95),
        ];
        let recs = build_recommendations("eval-1", &findings);
        for pair in recs.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }
}
