// Copyright 2025 Sushanth (https://github.com/sushanthpy)
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

//! Kycgraph Core
//!
//! Shared vocabulary of the kycgraph engine:
//! - raw entity/relationship mentions produced by document extraction
//! - deduplicated entities, communities and risk assessments
//! - the error taxonomy and dropped-record diagnostics
//! - pipeline configuration (risk thresholds, detection method)
//!
//! The graph algorithms themselves live in `kycgraph-analysis`.

pub mod config;
pub mod diagnostics;
pub mod entities;
pub mod error;

pub use config::{
    DetectionConfig, DetectionMethod, NormalizerConfig, PipelineConfig, RiskThresholds,
    StatsConfig,
};
pub use diagnostics::{Diagnostics, DropKind, DroppedRecord};
pub use entities::*;
pub use error::{KycGraphError, KycGraphResult};
