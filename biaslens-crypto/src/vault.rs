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

//! Credential vault adapter: AES-256-GCM with a PBKDF2-HMAC-SHA-256 derived
//! key, envelope layout `base64(salt[16] || iv[12] || ciphertext)`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::CryptoError;

const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const PBKDF2_ITERATIONS: u32 = 100_000;

fn derive_key(secret: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt `plaintext` under `secret`, returning the base64 envelope.
pub fn encrypt(secret: &str, plaintext: &[u8]) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut iv);

    let key_bytes = derive_key(secret, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&iv);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

    let mut envelope = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(envelope))
}

/// Decrypt a base64 envelope produced by [`encrypt`]. Fails with
/// [`CryptoError::Truncated`] if the decoded blob is under 28 bytes
/// (16-byte salt + 12-byte iv).
pub fn decrypt(secret: &str, envelope_base64: &str) -> Result<Vec<u8>, CryptoError> {
    let envelope = STANDARD.decode(envelope_base64)?;
    if envelope.len() < SALT_LEN + IV_LEN {
        return Err(CryptoError::Truncated(envelope.len()));
    }

    let (salt, rest) = envelope.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let key_bytes = derive_key(secret, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(iv);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Decrypt(e.to_string()))
}

/// Credential shapes a vaulted secret must decode into, keyed by storage
/// type. A mismatch between the stored `storage_type` and the requested one
/// fails non-retryably.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoredCredential {
    pub storage_type: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Decrypt and parse a credential envelope, asserting the stored
/// `storage_type` matches `expected_storage_type`.
pub fn decrypt_credential(
    secret: &str,
    envelope_base64: &str,
    expected_storage_type: &str,
) -> Result<StoredCredential, CryptoError> {
    let plaintext = decrypt(secret, envelope_base64)?;
    let credential: StoredCredential = serde_json::from_slice(&plaintext)?;
    if credential.storage_type != expected_storage_type {
        return Err(CryptoError::Decrypt(format!(
            "credential storage type mismatch: stored={}, requested={}",
            credential.storage_type, expected_storage_type
        )));
    }
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let secret = "test-secret";
        let plaintext = b"super secret api key";
        let envelope = encrypt(secret, plaintext).unwrap();
        let decrypted = decrypt(secret, &envelope).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_truncated_blob() {
        let short = STANDARD.encode(b"too-short");
        let err = decrypt("secret", &short).unwrap_err();
        assert!(matches!(err, CryptoError::Truncated(_)));
    }

    #[test]
    fn decrypt_with_wrong_secret_fails() {
        let envelope = encrypt("correct-secret", b"payload").unwrap();
        assert!(decrypt("wrong-secret", &envelope).is_err());
    }

    #[test]
    fn credential_storage_type_mismatch_is_rejected() {
        let cred = StoredCredential {
            storage_type: "object_store".into(),
            fields: serde_json::Map::new(),
        };
        let plaintext = serde_json::to_vec(&cred).unwrap();
        let envelope = encrypt("secret", &plaintext).unwrap();
        let err = decrypt_credential("secret", &envelope, "log_search").unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt(_)));
    }
}
