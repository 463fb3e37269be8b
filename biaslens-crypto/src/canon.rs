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

//! Canonical serialization, hashing and RSA-PKCS1v1.5/SHA-256 signing.

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Pre-order walk of a [`serde_json::Value`]: objects emit keys sorted by
/// code-point-wise ascending comparison, arrays preserve order, scalars use
/// the standard JSON form. Output is valid JSON.
pub fn stable_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
                out.push(':');
                write_value(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        scalar => {
            out.push_str(&serde_json::to_string(scalar).expect("scalar always serializes"));
        }
    }
}

/// SHA-256 of the UTF-8 bytes of `s`, hex lower-case.
pub fn hash_hex(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    hex::encode(digest)
}

/// Canonical content hash of an arbitrary JSON value.
pub fn canonical_hash(value: &Value) -> String {
    hash_hex(&stable_stringify(value))
}

/// Canonical content hash of a typed manifest.
pub fn canonical_hash_of<T: Serialize>(value: &T) -> Result<String, CryptoError> {
    let v = serde_json::to_value(value)?;
    Ok(canonical_hash(&v))
}

/// Legacy hash computed from the platform's default (struct-declaration-
/// order) JSON serialization, for backward-compatible verification of
/// packs signed before the canonical serializer existed.
pub fn legacy_hash_of<T: Serialize>(value: &T) -> Result<String, CryptoError> {
    let s = serde_json::to_string(value)?;
    Ok(hash_hex(&s))
}

/// Sign the UTF-8 bytes of a hex hash string (not the raw digest bytes)
/// with RSA-PKCS1v1.5-SHA-256, returning standard-alphabet padded base64.
pub fn sign_hash(private_key_pem: &str, hash_hex_str: &str) -> Result<String, CryptoError> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CryptoError::KeyParse(e.to_string()))?;
    let signing_key = SigningKey::<Sha256>::new(private_key);
    let signature = signing_key.try_sign(hash_hex_str.as_bytes())
        .map_err(|e| CryptoError::Sign(e.to_string()))?;
    Ok(STANDARD.encode(signature.to_bytes()))
}

/// Verify a base64 signature over the UTF-8 bytes of `hash_hex_str`.
pub fn verify_signature(
    public_key_pem: &str,
    hash_hex_str: &str,
    signature_base64: &str,
) -> Result<bool, CryptoError> {
    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CryptoError::KeyParse(e.to_string()))?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let raw = STANDARD.decode(signature_base64)?;
    let signature = match Signature::try_from(raw.as_slice()) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };
    Ok(verifying_key.verify(hash_hex_str.as_bytes(), &signature).is_ok())
}

/// A pack is valid iff `expected_hash` matches either the canonical or the
/// legacy hash of `content`, *and* the signature verifies over the
/// canonical hash.
pub fn verify_pack(
    content: &Value,
    expected_hash: &str,
    signature_base64: &str,
    public_key_pem: &str,
) -> Result<VerifyOutcome, CryptoError> {
    let canonical = canonical_hash(content);
    let legacy = hash_hex(&serde_json::to_string(content)?);
    let hash_matches = expected_hash == canonical || expected_hash == legacy;
    let signature_valid = verify_signature(public_key_pem, &canonical, signature_base64)?;
    Ok(VerifyOutcome {
        valid: hash_matches && signature_valid,
        hash_matches,
        signature_valid,
        computed_hash: canonical,
        legacy_hash: legacy,
    })
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub hash_matches: bool,
    pub signature_valid: bool,
    pub computed_hash: String,
    pub legacy_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use serde_json::json;

    fn test_keypair() -> (String, String) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = RsaPublicKey::from(&private_key);
        let priv_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap()
            .to_string();
        let pub_pem = public_key.to_public_key_pem(LineEnding::LF).unwrap();
        (priv_pem, pub_pem)
    }

    #[test]
    fn stable_stringify_is_invariant_under_key_reorder() {
        let a = json!({"b": 1, "a": 2, "c": [3, 2, 1]});
        let b = json!({"c": [3, 2, 1], "a": 2, "b": 1});
        assert_eq!(stable_stringify(&a), stable_stringify(&b));
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn stable_stringify_preserves_array_order() {
        let v = json!({"items": [1, 2, 3]});
        assert!(stable_stringify(&v).contains("[1,2,3]"));
    }

    #[test]
    fn single_bit_flip_changes_hash() {
        let a = json!({"value": 1});
        let b = json!({"value": 2});
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let (priv_pem, pub_pem) = test_keypair();
        let hash = canonical_hash(&json!({"a": 1}));
        let signature = sign_hash(&priv_pem, &hash).unwrap();
        assert!(verify_signature(&pub_pem, &hash, &signature).unwrap());
    }

    #[test]
    fn verify_fails_on_tampered_hash() {
        let (priv_pem, pub_pem) = test_keypair();
        let hash = canonical_hash(&json!({"a": 1}));
        let signature = sign_hash(&priv_pem, &hash).unwrap();
        let other_hash = canonical_hash(&json!({"a": 2}));
        assert!(!verify_signature(&pub_pem, &other_hash, &signature).unwrap());
    }

    #[test]
    fn verify_pack_accepts_legacy_hash() {
        let (priv_pem, pub_pem) = test_keypair();
        let content = json!({"b": 1, "a": 2});
        let canonical = canonical_hash(&content);
        let legacy = hash_hex(&serde_json::to_string(&content).unwrap());
        let signature = sign_hash(&priv_pem, &canonical).unwrap();

        let outcome = verify_pack(&content, &legacy, &signature, &pub_pem).unwrap();
        assert!(outcome.hash_matches);
        assert!(outcome.signature_valid);
        assert!(outcome.valid);
    }
}
