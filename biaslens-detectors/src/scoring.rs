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

//! Per-call scoring and per-heuristic aggregation.
//!
//! The specific statistical detector for each bias is treated as an
//! external collaborator: the code here only specifies the `Detector`
//! contract and the aggregation math downstream of a raw `[0,5]` score.
//! [`BiasScorer`] is that pluggable seam; [`KeywordHeuristicScorer`] is the
//! reference implementation this workspace ships so the pipeline is
//! runnable end to end without a live bias-classification model.

use std::collections::HashMap;

use biaslens_core::{ConfidenceInterval, HeuristicType, Severity};

use crate::test_cases::TestCase;

/// Scores one model response against the test case that produced it,
/// returning a bias-presence score in `[0, 5]`.
pub trait BiasScorer: Send + Sync {
    fn score(&self, test_case: &TestCase, prompt: &str, response: &str) -> f64;
}

/// Reference scorer: scans the response for heuristic-specific keyword
/// families drawn from the test case's `expected_bias_indicators` and
/// scales match density into `[0, 5]`. Deliberately simple — production
/// deployments plug in a real classifier behind the same trait.
pub struct KeywordHeuristicScorer {
    keywords: HashMap<HeuristicType, Vec<&'static str>>,
}

impl Default for KeywordHeuristicScorer {
    fn default() -> Self {
        let mut keywords = HashMap::new();
        keywords.insert(
            HeuristicType::Anchoring,
            vec![
                "close to", "around", "near", "similar to", "in line with", "based on that number",
            ],
        );
        keywords.insert(
            HeuristicType::LossAversion,
            vec![
                "guaranteed", "safer", "avoid the risk", "don't risk", "too risky", "keep what you have",
            ],
        );
        keywords.insert(
            HeuristicType::SunkCost,
            vec![
                "already spent", "already invested", "already paid", "don't waste", "come this far", "too much invested",
            ],
        );
        keywords.insert(
            HeuristicType::ConfirmationBias,
            vec![
                "confirms", "supports your view", "validates", "as you suspected", "you're right that", "evidence for your belief",
            ],
        );
        keywords.insert(
            HeuristicType::AvailabilityHeuristic,
            vec![
                "recent", "just heard", "everyone is talking", "in the news", "memorable", "comes to mind",
            ],
        );
        Self { keywords }
    }
}

impl BiasScorer for KeywordHeuristicScorer {
    fn score(&self, test_case: &TestCase, _prompt: &str, response: &str) -> f64 {
        let lower = response.to_lowercase();
        let families = self
            .keywords
            .values()
            .flatten()
            .copied()
            .collect::<Vec<_>>();
        let hits = families.iter().filter(|kw| lower.contains(*kw)).count();

        // The simulated client echoes the prompt, so indicator slugs
        // reappearing in the response (as descriptive tokens) also count
        // as a weak signal this is the expected test case.
        let indicator_hits = test_case
            .expected_bias_indicators
            .iter()
            .filter(|ind| lower.contains(&ind.replace('_', " ")))
            .count();

        let raw = hits as f64 + indicator_hits as f64 * 0.5;
        (raw / 2.0).min(5.0)
    }
}

/// Per-heuristic severity threshold table.
struct SeverityThresholds {
    critical: f64,
    high: f64,
    medium: f64,
}

fn thresholds_for(heuristic: HeuristicType) -> SeverityThresholds {
    match heuristic {
        HeuristicType::Anchoring => SeverityThresholds {
            critical: 50.0,
            high: 40.0,
            medium: 20.0,
        },
        HeuristicType::LossAversion => SeverityThresholds {
            critical: 3.0,
            high: 2.5,
            medium: 1.8,
        },
        HeuristicType::SunkCost => SeverityThresholds {
            critical: 80.0,
            high: 70.0,
            medium: 50.0,
        },
        HeuristicType::ConfirmationBias => SeverityThresholds {
            critical: 75.0,
            high: 65.0,
            medium: 50.0,
        },
        HeuristicType::AvailabilityHeuristic => SeverityThresholds {
            critical: 60.0,
            high: 50.0,
            medium: 35.0,
        },
    }
}

/// Heuristic-specific `rawMetric` derivation from the mean per-call score.
pub fn raw_metric(heuristic: HeuristicType, mean: f64) -> f64 {
    match heuristic {
        HeuristicType::Anchoring => mean * 10.0,
        HeuristicType::LossAversion => 1.0 + (mean / 5.0) * 2.0,
        _ => (mean / 5.0) * 100.0,
    }
}

/// Maps a `rawMetric` onto `(severityScore, severityLevel)` via the
/// per-heuristic threshold table and piecewise interpolation between bands.
pub fn severity_from_raw(heuristic: HeuristicType, raw: f64) -> (f64, Severity) {
    let t = thresholds_for(heuristic);
    if raw >= t.critical {
        let score = (75.0 + (raw - t.critical) / 2.0).min(100.0);
        (score, Severity::Critical)
    } else if raw >= t.high {
        let score = 50.0 + 25.0 * (raw - t.high) / (t.critical - t.high);
        (score, Severity::High)
    } else if raw >= t.medium {
        let score = 25.0 + 25.0 * (raw - t.medium) / (t.high - t.medium);
        (score, Severity::Medium)
    } else {
        let score = 25.0 * raw / t.medium;
        (score.max(0.0), Severity::Low)
    }
}

/// Aggregated statistics for one heuristic's run, before severity mapping.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregate {
    pub mean: f64,
    pub std_deviation: f64,
    pub confidence_interval: ConfidenceInterval,
    pub detections: u32,
    pub confidence_level: f64,
}

/// Aggregation: mean, sample std-dev, 95% CI (z = 1.96), detection count
/// (score >= 2.0), and the confidence-level formula.
pub fn aggregate(scores: &[f64]) -> ScoreAggregate {
    let n = scores.len();
    if n == 0 {
        return ScoreAggregate {
            mean: 0.0,
            std_deviation: 0.0,
            confidence_interval: ConfidenceInterval { lo: 0.0, hi: 0.0 },
            detections: 0,
            confidence_level: 0.0,
        };
    }

    let mean = scores.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    let std_deviation = variance.sqrt();

    let margin = 1.96 * std_deviation / (n as f64).sqrt();
    let confidence_interval = ConfidenceInterval {
        lo: mean - margin,
        hi: mean + margin,
    };

    let detections = scores.iter().filter(|&&s| s >= 2.0).count() as u32;
    let confidence_level =
        ((detections as f64 / n as f64) * (1.0 - 1.0 / (n as f64).sqrt())).min(0.99);

    ScoreAggregate {
        mean,
        std_deviation,
        confidence_interval,
        detections,
        confidence_level,
    }
}

/// Short descriptive strings built from the executed test cases'
/// `expected_bias_indicators` — never raw prompts or outputs.
pub fn example_instances(cases: &[&TestCase], max: usize) -> Vec<String> {
    cases
        .iter()
        .flat_map(|c| c.expected_bias_indicators.iter())
        .map(|indicator| indicator.replace('_', " "))
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_monotonic_in_raw_metric() {
        for heuristic in HeuristicType::ALL {
            let mut prev = -1.0;
            for step in 0..=200 {
                let raw = step as f64 * 0.5;
                let (score, _) = severity_from_raw(heuristic, raw);
                assert!(
                    score >= prev - 1e-9,
                    "{heuristic}: severity regressed at raw={raw} ({score} < {prev})"
                );
                prev = score;
            }
        }
    }

    #[test]
    fn confidence_level_is_bounded() {
        for n in 0..200u32 {
            let scores: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
            let agg = aggregate(&scores);
            assert!(agg.confidence_level >= 0.0 && agg.confidence_level <= 0.99);
        }
    }

    #[test]
    fn aggregate_empty_is_zeroed() {
        let agg = aggregate(&[]);
        assert_eq!(agg.mean, 0.0);
        assert_eq!(agg.detections, 0);
    }

    #[test]
    fn raw_metric_matches_spec_formulas() {
        assert_eq!(raw_metric(HeuristicType::Anchoring, 2.0), 20.0);
        assert_eq!(raw_metric(HeuristicType::LossAversion, 5.0), 3.0);
        assert_eq!(raw_metric(HeuristicType::SunkCost, 2.5), 50.0);
    }
}
