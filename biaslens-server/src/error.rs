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

//! The orchestrator's error taxonomy and its mapping onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use biaslens_core::CoreError;
use biaslens_crypto::CryptoError;
use biaslens_evidence::EvidenceCollectorError;
use biaslens_providers::ProviderError;
use biaslens_repro::ReproPackError;

/// `Input` / `Auth` / `NotFound` / `Config` / `Provider` / `Storage` / `Internal`.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    Input(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model provider error: {0}")]
    Provider(String),

    #[error("evidence storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn status(&self) -> StatusCode {
        match self {
            OrchestratorError::Input(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::Auth(_) => StatusCode::UNAUTHORIZED,
            OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrchestratorError::Provider(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrchestratorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<CoreError> for OrchestratorError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Invalid(msg) => OrchestratorError::Input(msg),
            CoreError::NotFound(msg) => OrchestratorError::NotFound(msg),
            CoreError::Internal(msg) => OrchestratorError::Internal(msg),
        }
    }
}

impl From<CryptoError> for OrchestratorError {
    fn from(e: CryptoError) -> Self {
        OrchestratorError::Config(e.to_string())
    }
}

impl From<ProviderError> for OrchestratorError {
    fn from(e: ProviderError) -> Self {
        OrchestratorError::Provider(e.to_string())
    }
}

impl From<EvidenceCollectorError> for OrchestratorError {
    fn from(e: EvidenceCollectorError) -> Self {
        OrchestratorError::Storage(e.to_string())
    }
}

impl From<ReproPackError> for OrchestratorError {
    fn from(e: ReproPackError) -> Self {
        OrchestratorError::Config(e.to_string())
    }
}
