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

/// Errors raised by the data model and store layer: `Invalid` / `NotFound` /
/// `Internal`. `Auth`, `Config`, `Provider` and `Storage` live closer to the
/// crates that own those concerns.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal store error: {0}")]
    Internal(String),
}
