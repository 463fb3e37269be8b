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

//! # BiasLens Providers
//!
//! Provider capability registry, achieved-determinism resolution, and the
//! pluggable model-client trait with concrete HTTP-backed implementations.

pub mod capability;
pub mod client;
pub mod error;
pub mod providers;

pub use capability::{
    resolve_achieved_level, should_reject_determinism_request, CapabilityRegistry,
    DecodingSupport, ProviderCapabilities, SeedSupport,
};
pub use client::{ChatMessage, ChatParameters, ModelClient, ModelResponse, SimulatedModelClient};
pub use error::ProviderError;
pub use providers::{AnthropicClient, DeepSeekClient, OllamaClient, OpenAiClient};
