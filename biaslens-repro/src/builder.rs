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

//! Builds, hashes, signs and records a reproducibility pack.

use biaslens_core::{ReproPack, SigningMaterial};
use biaslens_crypto::{canonical_hash_of, sign_hash};
use sha2::{Digest, Sha256};

use crate::error::ReproPackError;
use crate::manifest::ReproPackManifest;

/// `sha256_hex` of the raw UTF-8 output bytes, used for `output_hashes`
/// entries. Distinct from the manifest's own canonical content hash.
pub fn hash_output(output: &str) -> String {
    let digest = Sha256::digest(output.as_bytes());
    hex::encode(digest)
}

pub struct BuiltReproPack {
    pub manifest: ReproPackManifest,
    pub pack: ReproPack,
}

/// Computes `hash = sha256_hex(stableStringify(manifest))`, signs it with
/// the resolved [`SigningMaterial`], and assembles the persisted row.
pub fn build_repro_pack(
    manifest: ReproPackManifest,
    signing: &SigningMaterial,
    created_at: String,
) -> Result<BuiltReproPack, ReproPackError> {
    let content_hash = canonical_hash_of(&manifest)?;
    let signature = sign_hash(&signing.private_key_pem, &content_hash)?;
    let repro_pack_content = serde_json::to_value(&manifest)?;

    let pack = ReproPack {
        evaluation_run_id: manifest.evaluation_run_id.clone(),
        content_hash,
        signature,
        signing_authority: signing.authority.clone(),
        signing_key_id: signing.key_id.clone(),
        created_at,
        repro_pack_content,
    };

    Ok(BuiltReproPack { manifest, pack })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::*;
    use biaslens_core::{ConfidenceInterval, DeterminismMode, HeuristicType, ParametersUsed, SigningMode, ZoneStatus};
    use biaslens_crypto::verify_signature;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use std::collections::HashMap;

    fn test_signing_material() -> SigningMaterial {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = RsaPublicKey::from(&private_key);
        SigningMaterial {
            mode: SigningMode::Biaslens,
            authority: "BiasLens".into(),
            key_id: "key-1".into(),
            private_key_pem: private_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
            public_key_pem: public_key.to_public_key_pem(LineEnding::LF).unwrap(),
        }
    }

    fn test_manifest() -> ReproPackManifest {
        ReproPackManifest {
            schema_version: SCHEMA_VERSION.to_string(),
            evaluation_run_id: "run-1".into(),
            detector_version: "0.1.0".into(),
            timestamps: Timestamps {
                started_at: "2026-07-29T00:00:00Z".into(),
                aggregated_at: "2026-07-29T00:01:00Z".into(),
                completed_at: "2026-07-29T00:01:30Z".into(),
            },
            model_configuration: ModelConfiguration {
                ai_system_name: "demo".into(),
                heuristic_types: vec![HeuristicType::Anchoring],
                iteration_count: 10,
                iterations_run: 10,
                determinism_mode: DeterminismMode::Standard,
                seed_value: 42,
                decoding_parameters: ParametersUsed { temperature: 0.7, top_p: 1.0, top_k: None, max_tokens: 256 },
            },
            test_suite: TestSuiteSummary { heuristics: vec![HeuristicType::Anchoring], iterations: 10, iterations_run: 10 },
            prompt_set: vec![],
            output_hashes: vec![],
            aggregate_metrics: AggregateMetrics {
                overall_score: 42.0,
                zone_status: ZoneStatus::Green,
                confidence_intervals: HashMap::new(),
            },
            evidence_reference_id: None,
            replay_instructions: ReplayInstructions {
                test_suite: ReplayTestSuite { cases: 5, iterations: 10, iterations_run: 10 },
                model: ReplayModel {
                    provider: "simulated".into(),
                    model_name: "simulated-v1".into(),
                    sampling_parameters: ParametersUsed { temperature: 0.7, top_p: 1.0, top_k: None, max_tokens: 256 },
                    determinism: DeterminismSummary { mode: DeterminismMode::Standard, seed: 42, achieved_level: None },
                },
                detector: ReplayDetector { version: "0.1.0".into(), heuristics: vec![HeuristicType::Anchoring] },
                evidence: None,
                metrics: None,
                replay_steps: vec!["re-run each prompt with the recorded seed and parameters".into()],
            },
            signing: SigningBlock {
                mode: SigningMode::Biaslens,
                authority: "BiasLens".into(),
                key_id: "key-1".into(),
                public_key: "placeholder".into(),
            },
        }
    }

    #[test]
    fn hash_is_invariant_under_key_reorder() {
        let signing = test_signing_material();
        let manifest = test_manifest();
        let built_a = build_repro_pack(manifest.clone(), &signing, "2026-07-29T00:01:31Z".into()).unwrap();

        // serde_json::Value key order differs only at the Value level, which
        // canonical_hash_of already normalizes before hashing.
        let built_b = build_repro_pack(manifest, &signing, "2026-07-29T00:01:31Z".into()).unwrap();
        assert_eq!(built_a.pack.content_hash, built_b.pack.content_hash);
    }

    #[test]
    fn signature_verifies_against_content_hash() {
        let signing = test_signing_material();
        let manifest = test_manifest();
        let built = build_repro_pack(manifest, &signing, "2026-07-29T00:01:31Z".into()).unwrap();
        assert!(verify_signature(&signing.public_key_pem, &built.pack.content_hash, &built.pack.signature).unwrap());
    }

    #[test]
    fn output_hash_matches_plain_sha256() {
        let hash = hash_output("hello world");
        assert_eq!(hash.len(), 64);
    }
}
