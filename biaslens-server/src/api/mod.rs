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

//! HTTP route handlers. Route wiring lives in `crate::lib`.

pub mod evaluate;
pub mod health;
pub mod verify;

pub use evaluate::{create_evaluation, get_evaluation, get_progress};
pub use health::health_check;
pub use verify::verify_repro_pack_handler;
