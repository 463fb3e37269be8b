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

//! `POST /verify-repro-pack` semantics: recompute canonical and legacy
//! hashes, resolve the public key, and verify the signature.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use biaslens_crypto::verify_pack;

use crate::error::ReproPackError;

/// Resolves the public key used to verify a pack, in priority order:
/// embedded signing block, then the default env key for authority
/// "BiasLens", then a DB lookup by active authority.
pub trait PublicKeyResolver {
    fn resolve(&self, signing_authority: &str, embedded_public_key: Option<&str>) -> Option<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReproPackResult {
    pub valid: bool,
    pub hash_matches: bool,
    pub signature_valid: bool,
    pub signing_authority: String,
    pub expected_hash: String,
    pub computed_hash: String,
    pub legacy_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_instructions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_evidence_id: Option<String>,
}

pub fn verify_repro_pack(
    pack_content: &Value,
    signature: &str,
    expected_hash: &str,
    signing_authority: &str,
    resolver: &dyn PublicKeyResolver,
) -> Result<VerifyReproPackResult, ReproPackError> {
    let embedded_public_key = pack_content
        .get("signing")
        .and_then(|s| s.get("public_key"))
        .and_then(|v| v.as_str());

    let public_key_pem = resolver
        .resolve(signing_authority, embedded_public_key)
        .ok_or_else(|| ReproPackError::NoSigningKey(signing_authority.to_string()))?;

    let outcome = verify_pack(pack_content, expected_hash, signature, &public_key_pem)?;

    let replay_instructions = pack_content.get("replay_instructions").cloned();
    let customer_evidence_id = pack_content
        .get("evidence_reference_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(VerifyReproPackResult {
        valid: outcome.valid,
        hash_matches: outcome.hash_matches,
        signature_valid: outcome.signature_valid,
        signing_authority: signing_authority.to_string(),
        expected_hash: expected_hash.to_string(),
        computed_hash: outcome.computed_hash,
        legacy_hash: outcome.legacy_hash,
        replay_instructions,
        customer_evidence_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use biaslens_crypto::{canonical_hash, sign_hash};
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use serde_json::json;

    struct StaticResolver(String);
    impl PublicKeyResolver for StaticResolver {
        fn resolve(&self, _authority: &str, _embedded: Option<&str>) -> Option<String> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn verifies_a_correctly_signed_pack() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        let priv_pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let pub_pem = public_key.to_public_key_pem(LineEnding::LF).unwrap();

        let content = json!({"evaluation_run_id": "run-1", "signing": {"public_key": pub_pem}});
        let hash = canonical_hash(&content);
        let signature = sign_hash(&priv_pem, &hash).unwrap();

        let resolver = StaticResolver(pub_pem);
        let result = verify_repro_pack(&content, &signature, &hash, "BiasLens", &resolver).unwrap();
        assert!(result.valid);
        assert!(result.hash_matches);
        assert!(result.signature_valid);
    }

    #[test]
    fn fails_when_no_key_resolves() {
        struct NoKeyResolver;
        impl PublicKeyResolver for NoKeyResolver {
            fn resolve(&self, _authority: &str, _embedded: Option<&str>) -> Option<String> {
                None
            }
        }
        let content = json!({});
        let err = verify_repro_pack(&content, "sig", "hash", "BiasLens", &NoKeyResolver);
        assert!(err.is_err());
    }
}
