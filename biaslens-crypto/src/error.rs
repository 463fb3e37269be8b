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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("key parse error: {0}")]
    KeyParse(String),

    #[error("signing failed: {0}")]
    Sign(String),

    #[error("signature verification failed")]
    VerifyFailed,

    #[error("encrypted blob too short: expected at least 28 bytes, got {0}")]
    Truncated(usize),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}
