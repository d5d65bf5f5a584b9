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

//! Kycgraph Analysis
//!
//! Turns extracted entity/relationship mentions into a clustered, risk-tiered
//! knowledge graph:
//! - Entity resolution and normalization
//! - Weighted graph construction with duplicate-pair collapsing
//! - Greedy modularity (CNM) and connected-component community detection
//! - Threshold-based KYC/AML risk tiers
//! - Structured statistics for downstream reporting
//!
//! ## Architecture
//!
//! ```text
//! Mentions → Entity Resolution → Knowledge Graph → Communities → Risk Tiers
//!                 ↓                    ↓                ↓             ↓
//!          (Normalization)      (Edge collapsing)    (CNM)     (Thresholds)
//!                                                                     ↓
//!                                                              AnalysisRecord
//! ```
//!
//! ## Example
//!
//! ```
//! use kycgraph_analysis::Pipeline;
//! use kycgraph_core::{ExtractionBatch, PipelineConfig};
//!
//! let batch = ExtractionBatch::from_json_str(r#"{
//!     "entities": [
//!         {"name": "Acme Ltd", "type": "COMPANY"},
//!         {"name": "Jane Roe", "type": "DIRECTOR"}
//!     ],
//!     "relationships": [{"source": "Jane Roe", "target": "Acme Ltd", "relation": "director_of"}]
//! }"#).unwrap();
//!
//! let output = Pipeline::new(PipelineConfig::default()).unwrap().run(&batch).unwrap();
//! assert_eq!(output.record.graph_stats.community_count, 1);
//! ```

pub mod builder;
pub mod community;
pub mod graph;
pub mod normalizer;
pub mod pipeline;
pub mod risk;
pub mod stats;

pub use builder::{BuildOutcome, GraphBuilder};
pub use community::{
    detector_for, modularity, verify_partition, CommunityDetector, ConnectedComponents,
    GreedyModularity, MergeStep, Partition,
};
pub use graph::{Edge, EdgeKey, KnowledgeGraph};
pub use normalizer::{normalize_name, EntityNormalizer, EntitySet};
pub use pipeline::{Pipeline, PipelineOutput};
pub use risk::{density, RiskClassifier};
pub use stats::{
    AnalysisRecord, CommunitySizeSummary, CommunitySummary, GraphStats, RankedEntity,
    SampleEdge, StatsAggregator,
};
