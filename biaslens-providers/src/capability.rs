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

//! Provider capability registry and achieved-determinism resolution.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSupport {
    Full,
    Partial,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingSupport {
    TemperatureOnly,
    TopP,
    TopPTopK,
}

#[derive(Debug, Clone)]
pub struct ProviderCapabilities {
    pub seed_support: SeedSupport,
    pub min_temperature: f64,
    pub decoding_support: DecodingSupport,
    pub guidance: &'static str,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            seed_support: SeedSupport::Partial,
            min_temperature: 0.0,
            decoding_support: DecodingSupport::TopP,
            guidance: "unknown provider: treated as partial seed support with top-p decoding",
        }
    }
}

/// Static capability table keyed by provider id. Unknown providers fall
/// back to [`ProviderCapabilities::default`] (partial/top-p).
pub struct CapabilityRegistry {
    table: HashMap<&'static str, ProviderCapabilities>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        let mut table = HashMap::new();
        table.insert(
            "openai",
            ProviderCapabilities {
                seed_support: SeedSupport::Partial,
                min_temperature: 0.0,
                decoding_support: DecodingSupport::TopPTopK,
                guidance: "OpenAI honors `seed` as a best-effort hint; responses may still drift across calls",
            },
        );
        table.insert(
            "anthropic",
            ProviderCapabilities {
                seed_support: SeedSupport::None,
                min_temperature: 0.0,
                decoding_support: DecodingSupport::TopPTopK,
                guidance: "Anthropic models do not expose a seed parameter; determinism cannot be requested",
            },
        );
        table.insert(
            "deepseek",
            ProviderCapabilities {
                seed_support: SeedSupport::None,
                min_temperature: 0.0,
                decoding_support: DecodingSupport::TemperatureOnly,
                guidance: "DeepSeek's chat completion API has no seed parameter",
            },
        );
        table.insert(
            "ollama",
            ProviderCapabilities {
                seed_support: SeedSupport::Full,
                min_temperature: 0.0,
                decoding_support: DecodingSupport::TopPTopK,
                guidance: "Ollama passes `seed` straight to the underlying runtime and is fully reproducible for a pinned model file",
            },
        );
        Self { table }
    }

    pub fn capabilities_for(&self, provider_id: &str) -> ProviderCapabilities {
        self.table
            .get(provider_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Clone for ProviderCapabilities {
    fn clone(&self) -> Self {
        Self {
            seed_support: self.seed_support,
            min_temperature: self.min_temperature,
            decoding_support: self.decoding_support,
            guidance: self.guidance,
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Derives the `achievedLevel` tag describing which determinism knobs
/// actually applied for a given request against a given provider.
pub fn resolve_achieved_level(
    caps: &ProviderCapabilities,
    deterministic_enabled: bool,
    requested_temperature: Option<f64>,
    requested_top_k: Option<u32>,
) -> String {
    if !deterministic_enabled {
        return "standard".to_string();
    }
    if caps.seed_support == SeedSupport::None {
        return "standard:no_seed_support".to_string();
    }

    let mut parts = Vec::new();
    parts.push(match caps.seed_support {
        SeedSupport::Full => "seeded",
        SeedSupport::Partial => "seeded_best_effort",
        SeedSupport::None => unreachable!(),
    });

    let temp_floor_tag;
    if let Some(req_temp) = requested_temperature {
        if req_temp < caps.min_temperature {
            temp_floor_tag = format!("temp_floor_{}", caps.min_temperature);
            parts.push(temp_floor_tag.as_str());
        }
    }

    match caps.decoding_support {
        DecodingSupport::TemperatureOnly => parts.push("decoding_temperature_only"),
        DecodingSupport::TopP if requested_top_k.is_some() => parts.push("decoding_top_p_only"),
        _ => {}
    }

    parts.join("|")
}

/// Whether a request for deterministic execution must be rejected outright
/// (no evaluation row created) versus silently downgraded to `standard`.
pub fn should_reject_determinism_request(
    caps: &ProviderCapabilities,
    deterministic_enabled: bool,
    allow_nondeterministic_fallback: bool,
) -> bool {
    deterministic_enabled && caps.seed_support == SeedSupport::None && !allow_nondeterministic_fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_deterministic_request_is_always_standard() {
        let caps = CapabilityRegistry::new().capabilities_for("openai");
        assert_eq!(resolve_achieved_level(&caps, false, Some(1.0), None), "standard");
    }

    #[test]
    fn no_seed_support_yields_standard_no_seed_support() {
        let caps = CapabilityRegistry::new().capabilities_for("anthropic");
        assert_eq!(
            resolve_achieved_level(&caps, true, Some(0.5), None),
            "standard:no_seed_support"
        );
    }

    #[test]
    fn full_seed_support_yields_seeded() {
        let caps = CapabilityRegistry::new().capabilities_for("ollama");
        assert_eq!(resolve_achieved_level(&caps, true, Some(0.5), None), "seeded");
    }

    #[test]
    fn partial_seed_support_yields_best_effort() {
        let caps = CapabilityRegistry::new().capabilities_for("openai");
        assert_eq!(
            resolve_achieved_level(&caps, true, Some(0.5), None),
            "seeded_best_effort"
        );
    }

    #[test]
    fn unknown_provider_defaults_to_partial_top_p() {
        let caps = CapabilityRegistry::new().capabilities_for("some-new-provider");
        assert_eq!(caps.seed_support, SeedSupport::Partial);
        assert_eq!(caps.decoding_support, DecodingSupport::TopP);
    }

    #[test]
    fn determinism_refusal_when_no_seed_support_and_no_fallback() {
        let caps = CapabilityRegistry::new().capabilities_for("anthropic");
        assert!(should_reject_determinism_request(&caps, true, false));
        assert!(!should_reject_determinism_request(&caps, true, true));
        assert!(!should_reject_determinism_request(&caps, false, false));
    }
}
