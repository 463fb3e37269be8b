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

//! `POST /verify-repro-pack`.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use biaslens_core::store::ReproPackStore;
use biaslens_repro::{verify_repro_pack, PublicKeyResolver, VerifyReproPackResult};

use crate::auth::AuthContext;
use crate::error::OrchestratorError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyReproPackRequest {
    #[serde(default)]
    pub repro_pack_id: Option<String>,
    #[serde(default)]
    pub pack_content: Option<Value>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub expected_hash: Option<String>,
    #[serde(default)]
    pub signing_authority: Option<String>,
}

/// Resolution order: embedded signing block, then the default env key for
/// the process authority, then a customer-scoped override looked up for
/// the caller's own team.
struct ConfiguredKeyResolver<'a> {
    state: &'a AppState,
    team_id: &'a str,
}

impl PublicKeyResolver for ConfiguredKeyResolver<'_> {
    fn resolve(&self, signing_authority: &str, embedded_public_key: Option<&str>) -> Option<String> {
        if let Some(key) = embedded_public_key {
            return Some(key.to_string());
        }

        let default_authority = self
            .state
            .config
            .secrets
            .repro_pack_signing_authority
            .as_deref()
            .unwrap_or("BiasLens");
        if signing_authority == default_authority {
            if let Some(key) = &self.state.config.secrets.repro_pack_signing_public_key {
                return Some(key.clone());
            }
        }

        if let Ok(Some(material)) = self.state.store.customer_signing_material(self.team_id) {
            if material.authority == signing_authority {
                return Some(material.public_key_pem);
            }
        }

        None
    }
}

pub async fn verify_repro_pack_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<VerifyReproPackRequest>,
) -> Result<Json<VerifyReproPackResult>, OrchestratorError> {
    let (pack_content, signature, expected_hash, signing_authority) = if let Some(id) = request.repro_pack_id {
        let record = ReproPackStore::get(&state.store, &id)?
            .ok_or_else(|| OrchestratorError::NotFound(format!("repro pack {id} not found")))?;
        (record.repro_pack_content, record.signature, record.content_hash, record.signing_authority)
    } else {
        let pack_content = request
            .pack_content
            .ok_or_else(|| OrchestratorError::Input("packContent or reproPackId is required".into()))?;
        let signature = request
            .signature
            .ok_or_else(|| OrchestratorError::Input("signature is required".into()))?;
        let expected_hash = request
            .expected_hash
            .ok_or_else(|| OrchestratorError::Input("expectedHash is required".into()))?;
        let signing_authority = request.signing_authority.unwrap_or_else(|| "BiasLens".to_string());
        (pack_content, signature, expected_hash, signing_authority)
    };

    let resolver = ConfiguredKeyResolver {
        state: &state,
        team_id: &auth.team_id,
    };
    let result = verify_repro_pack(&pack_content, &signature, &expected_hash, &signing_authority, &resolver)?;
    Ok(Json(result))
}
