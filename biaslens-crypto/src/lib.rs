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

//! # BiasLens Crypto
//!
//! Canonical JSON hashing, RSA-PKCS1v1.5/SHA-256 signing and verification
//! for reproducibility packs, and the AES-256-GCM credential vault envelope.

pub mod canon;
pub mod error;
pub mod vault;

pub use canon::{
    canonical_hash, canonical_hash_of, hash_hex, legacy_hash_of, sign_hash, stable_stringify,
    verify_pack, verify_signature, VerifyOutcome,
};
pub use error::CryptoError;
pub use vault::{decrypt, decrypt_credential, encrypt, StoredCredential};
