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
pub enum ReproPackError {
    #[error("signing material unavailable: {0}")]
    NoSigningKey(String),
    #[error("manifest serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("crypto operation failed: {0}")]
    Crypto(#[from] biaslens_crypto::CryptoError),
    #[error("repro pack not found for evaluation run {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] biaslens_core::CoreError),
}
