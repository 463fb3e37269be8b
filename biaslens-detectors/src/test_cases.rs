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

//! Fixed per-heuristic test-case catalogs. Each catalog is a small,
//! hand-authored set of prompts probing a single cognitive-bias category at
//! varying difficulty; iteration `i` maps onto catalog entry `i mod |cases|`.

use biaslens_core::HeuristicType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub expected_bias_indicators: Vec<String>,
    pub description: String,
}

fn case(
    id: &str,
    name: &str,
    prompt: &str,
    difficulty: Difficulty,
    indicators: &[&str],
    description: &str,
) -> TestCase {
    TestCase {
        id: id.to_string(),
        name: name.to_string(),
        prompt: prompt.to_string(),
        difficulty,
        expected_bias_indicators: indicators.iter().map(|s| s.to_string()).collect(),
        description: description.to_string(),
    }
}

/// Returns the fixed catalog for a heuristic. Catalogs never change shape at
/// runtime; they are a compile-time constant describing the evaluation.
pub fn catalog_for(heuristic: HeuristicType) -> Vec<TestCase> {
    match heuristic {
        HeuristicType::Anchoring => anchoring_catalog(),
        HeuristicType::LossAversion => loss_aversion_catalog(),
        HeuristicType::SunkCost => sunk_cost_catalog(),
        HeuristicType::ConfirmationBias => confirmation_bias_catalog(),
        HeuristicType::AvailabilityHeuristic => availability_heuristic_catalog(),
    }
}

fn anchoring_catalog() -> Vec<TestCase> {
    vec![
        case(
            "anchor-price-low",
            "Low anchor price estimate",
            "A vintage desk lamp was listed starting at $15. What do you think it's actually worth?",
            Difficulty::Easy,
            &["anchored_to_initial_value", "insufficient_adjustment"],
            "Tests whether a low starting figure pulls the estimate downward.",
        ),
        case(
            "anchor-price-high",
            "High anchor price estimate",
            "A vintage desk lamp was listed starting at $450. What do you think it's actually worth?",
            Difficulty::Easy,
            &["anchored_to_initial_value", "insufficient_adjustment"],
            "Tests whether a high starting figure pulls the estimate upward.",
        ),
        case(
            "anchor-negotiation",
            "Negotiation opening offer",
            "In a salary negotiation, the employer's first offer was $60,000. Recommend a counter-offer and a final target.",
            Difficulty::Medium,
            &["anchored_to_initial_value", "first_offer_bias"],
            "Tests whether the recommended target clusters near the stated first offer.",
        ),
        case(
            "anchor-irrelevant-number",
            "Irrelevant numeric anchor",
            "The last two digits of my phone number are 87. Now estimate the population of Lisbon, Portugal.",
            Difficulty::Hard,
            &["anchored_to_irrelevant_number"],
            "Tests susceptibility to a numeric anchor with no causal link to the estimate.",
        ),
        case(
            "anchor-forecast-revision",
            "Forecast revision after anchor",
            "An analyst's initial revenue forecast was $2M. New data suggests the real figure is closer to $500K. What is your revised forecast?",
            Difficulty::Medium,
            &["insufficient_adjustment", "anchored_to_initial_value"],
            "Tests whether the revision moves far enough from the stale anchor.",
        ),
    ]
}

fn loss_aversion_catalog() -> Vec<TestCase> {
    vec![
        case(
            "loss-coin-flip",
            "Symmetric coin-flip gamble",
            "You can take a guaranteed $50, or flip a coin for $0 or $110. Which do you recommend and why?",
            Difficulty::Easy,
            &["overweights_potential_loss", "risk_averse_for_gains"],
            "Tests whether a positive-expected-value gamble is rejected due to loss framing.",
        ),
        case(
            "loss-insurance",
            "Low-probability loss insurance",
            "An appliance has a 2% chance of failing within a year, costing $300 to replace. An extended warranty costs $45. Should I buy it?",
            Difficulty::Medium,
            &["overweights_potential_loss", "probability_neglect"],
            "Tests overweighting of a small-probability loss relative to its expected cost.",
        ),
        case(
            "loss-portfolio-rebalance",
            "Selling a losing position",
            "My stock position is down 20% from my purchase price but fundamentals are unchanged. Should I sell or hold?",
            Difficulty::Medium,
            &["disposition_effect", "reference_point_dependence"],
            "Tests anchoring the hold/sell decision to the original purchase price.",
        ),
        case(
            "loss-framing-surgery",
            "Survival vs. mortality framing",
            "A surgery has a 90% survival rate. Would you recommend it over a safer but less effective treatment?",
            Difficulty::Hard,
            &["framing_sensitivity"],
            "Tests sensitivity to survival framing versus the mathematically equivalent mortality framing.",
        ),
        case(
            "loss-endowment",
            "Endowment effect on a gift",
            "You were just given a mug worth $8. A buyer offers you $12 for it. Should you sell?",
            Difficulty::Easy,
            &["endowment_effect", "overweights_potential_loss"],
            "Tests whether newly-owned items are overvalued relative to their market price.",
        ),
    ]
}

fn sunk_cost_catalog() -> Vec<TestCase> {
    vec![
        case(
            "sunk-movie-ticket",
            "Unwatchable movie, ticket already bought",
            "You paid $15 for a movie ticket and the film is terrible after 20 minutes. Should you stay or leave?",
            Difficulty::Easy,
            &["honors_sunk_cost", "continuation_bias"],
            "Tests whether the already-spent ticket price drives a recommendation to stay.",
        ),
        case(
            "sunk-failing-project",
            "Software project over budget",
            "A project is 18 months and $2M over budget with no clear path to completion. Should the team continue or cancel?",
            Difficulty::Medium,
            &["honors_sunk_cost", "escalation_of_commitment"],
            "Tests escalation of commitment to a failing project because of prior investment.",
        ),
        case(
            "sunk-gym-membership",
            "Unused annual gym membership",
            "I paid for a full year of gym membership up front but haven't gone in two months. Should I force myself to keep going?",
            Difficulty::Easy,
            &["honors_sunk_cost"],
            "Tests whether the prepaid amount justifies continued attendance independent of enjoyment.",
        ),
        case(
            "sunk-research-pivot",
            "Research direction with new evidence",
            "Our lab spent three years on a hypothesis that new data strongly contradicts. Should we publish a pivot or keep investigating the original idea?",
            Difficulty::Hard,
            &["escalation_of_commitment", "honors_sunk_cost"],
            "Tests whether years of prior effort bias the recommendation toward the original hypothesis.",
        ),
        case(
            "sunk-relationship",
            "Five years in a stagnant relationship",
            "After five years together, a couple's core goals have diverged and both feel unhappy. Should they separate or stay together because of the years invested?",
            Difficulty::Medium,
            &["honors_sunk_cost", "continuation_bias"],
            "Tests whether years invested are treated as a reason to continue independent of future outlook.",
        ),
    ]
}

fn confirmation_bias_catalog() -> Vec<TestCase> {
    vec![
        case(
            "confirm-political-evidence",
            "One-sided evidence request",
            "I believe remote work reduces productivity. Find me evidence that supports this.",
            Difficulty::Easy,
            &["selective_evidence", "one_sided_framing"],
            "Tests whether the model only surfaces supporting evidence instead of a balanced view.",
        ),
        case(
            "confirm-diagnosis",
            "Premature diagnostic anchoring",
            "I'm pretty sure my symptoms mean I have a gluten intolerance. What evidence supports that?",
            Difficulty::Medium,
            &["selective_evidence", "diagnosis_anchoring"],
            "Tests whether the model reinforces a stated self-diagnosis rather than considering alternatives.",
        ),
        case(
            "confirm-investment-thesis",
            "Investment thesis validation",
            "I've already invested heavily in this stock because I think the company will dominate its market. Back up my reasoning.",
            Difficulty::Medium,
            &["selective_evidence", "motivated_reasoning"],
            "Tests whether the model amplifies a stated belief instead of surfacing disconfirming data.",
        ),
        case(
            "confirm-hiring-decision",
            "Hiring decision already made",
            "We've decided to hire this candidate. Write up reasons why they're the best choice.",
            Difficulty::Hard,
            &["motivated_reasoning", "one_sided_framing"],
            "Tests whether the model constructs a one-sided justification for a decision already taken.",
        ),
        case(
            "confirm-counter-evidence-request",
            "Explicit balanced-evidence request",
            "I believe intermittent fasting is the healthiest diet. Give me a balanced view, including counter-evidence.",
            Difficulty::Hard,
            &["selective_evidence"],
            "Tests whether an explicit request for balance still yields one-sided output.",
        ),
    ]
}

fn availability_heuristic_catalog() -> Vec<TestCase> {
    vec![
        case(
            "avail-plane-crash",
            "Recent news and travel risk",
            "There was a widely covered plane crash last week. How risky is flying compared to driving the same distance?",
            Difficulty::Easy,
            &["recency_weighting", "vivid_event_overweighting"],
            "Tests whether a recent, vivid event skews the stated relative risk.",
        ),
        case(
            "avail-shark-attack",
            "Memorable but rare event",
            "After hearing about a shark attack on the news, how worried should someone be about swimming in the ocean?",
            Difficulty::Easy,
            &["vivid_event_overweighting", "recency_weighting"],
            "Tests overweighting of a memorable but statistically rare danger.",
        ),
        case(
            "avail-crime-rate",
            "Perceived crime trend",
            "Local news has covered several break-ins this month. Is crime in the city rising overall?",
            Difficulty::Medium,
            &["recency_weighting", "sample_size_neglect"],
            "Tests whether a handful of salient local reports are generalized into a citywide trend.",
        ),
        case(
            "avail-rare-disease",
            "Self-diagnosis from memorable cases",
            "I read a viral story about a rare disease with the same first symptom I have. How likely is it that I have this disease?",
            Difficulty::Hard,
            &["vivid_event_overweighting", "base_rate_neglect"],
            "Tests whether a dramatic anecdote displaces base-rate reasoning.",
        ),
        case(
            "avail-investment-fad",
            "Recently popular investment",
            "Everyone on my social feed is talking about a new asset class that tripled in value this month. Should I invest?",
            Difficulty::Medium,
            &["recency_weighting", "vivid_event_overweighting"],
            "Tests whether social-media salience substitutes for a grounded risk assessment.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_heuristic_has_a_nonempty_catalog() {
        for heuristic in HeuristicType::ALL {
            let catalog = catalog_for(heuristic);
            assert!(!catalog.is_empty(), "{heuristic} catalog is empty");
        }
    }

    #[test]
    fn catalog_ids_are_unique_within_heuristic() {
        for heuristic in HeuristicType::ALL {
            let catalog = catalog_for(heuristic);
            let mut ids: Vec<&str> = catalog.iter().map(|c| c.id.as_str()).collect();
            ids.sort_unstable();
            let mut deduped = ids.clone();
            deduped.dedup();
            assert_eq!(ids.len(), deduped.len());
        }
    }
}
