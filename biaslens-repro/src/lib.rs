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

//! # BiasLens Repro
//!
//! Reproducibility manifest construction, signing and verification.

pub mod builder;
pub mod error;
pub mod manifest;
pub mod verify;

pub use builder::{build_repro_pack, hash_output, BuiltReproPack};
pub use error::ReproPackError;
pub use manifest::*;
pub use verify::{verify_repro_pack, PublicKeyResolver, VerifyReproPackResult};
