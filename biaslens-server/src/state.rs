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

//! Shared application state, mirroring `agentreplay_server::api::AppState`'s
//! role as the single `Clone`-able handle axum hands to every route.
//!
//! The control-plane store is held as the concrete
//! `biaslens_core::store::memory::InMemoryStore` rather than a `dyn` trait
//! object: `EvaluationStore::update` takes a generic `FnOnce` closure, which
//! is not object-safe. A production deployment swaps this field for its own
//! database-backed type and recompiles against the same trait bounds; the
//! store traits in `biaslens-core` remain the integration seam.

use std::sync::Arc;

use biaslens_core::store::memory::InMemoryStore;
use biaslens_providers::CapabilityRegistry;
use biaslens_scheduler::SchedulerRegistry;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InMemoryStore>,
    pub config: Arc<ServerConfig>,
    pub capability_registry: Arc<CapabilityRegistry>,
    pub scheduler_registry: Arc<SchedulerRegistry>,
}

impl AppState {
    pub fn new(store: Arc<InMemoryStore>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            capability_registry: Arc::new(CapabilityRegistry::new()),
            scheduler_registry: Arc::new(SchedulerRegistry::new()),
        }
    }
}
