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

//! # BiasLens Evidence
//!
//! Pluggable evidence-backend shipping: error classification and retry
//! policy plus adaptive batch delivery.

pub mod backends;
pub mod error;
pub mod shipper;

pub use backends::{
    generate_reference_id, generate_run_reference_id, store_with_retry, EvidenceBackend,
    EvidenceData, ReferenceInfo, DEFAULT_MAX_RETRIES,
};
pub use backends::document_search::DocumentSearchBackend;
pub use backends::log_search::LogSearchBackend;
pub use backends::mock::MockBackend;
pub use backends::object_store::ObjectStoreBackend;
pub use error::{ErrorCategory, EvidenceCollectorError, RateLimitInfo};
pub use shipper::{decide_ship_mode, BatchShipResult, EvidenceBatchShipper, ShipMode};
