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

//! # BiasLens Core
//!
//! Data model and control-plane store contracts shared across the BiasLens
//! evaluation pipeline. This crate owns no network or cryptographic code —
//! just the entities of the evaluation run lifecycle and the trait seams a
//! real control-plane database implements.

pub mod error;
pub mod ids;
pub mod store;
pub mod types;

pub use error::CoreError;
pub use types::*;
