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

//! End-to-end analysis pipeline
//!
//! ```text
//! ExtractionBatch → Normalizer → GraphBuilder → CommunityDetector
//!                                                      ↓
//!                  AnalysisRecord ← StatsAggregator ← RiskClassifier
//! ```
//!
//! Each stage consumes the finished output of the previous one: edges are
//! only resolved against the complete entity set, and detection only runs on
//! the finished graph.

use crate::builder::GraphBuilder;
use crate::community::{detector_for, CommunityDetector, Partition};
use crate::graph::KnowledgeGraph;
use crate::normalizer::EntityNormalizer;
use crate::risk::RiskClassifier;
use crate::stats::{AnalysisRecord, StatsAggregator};
use kycgraph_core::{ExtractionBatch, KycGraphResult, PipelineConfig, RiskLevel};
use tracing::{info, warn};

/// Output of one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub graph: KnowledgeGraph,
    pub partition: Partition,
    pub record: AnalysisRecord,
}

/// Normalize, build, cluster, classify and summarize one extraction batch
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: EntityNormalizer,
    detector: Box<dyn CommunityDetector>,
    classifier: RiskClassifier,
    stats: StatsAggregator,
}

impl Pipeline {
    /// Validates the whole configuration before any data is seen
    pub fn new(config: PipelineConfig) -> KycGraphResult<Self> {
        config.validate()?;

        Ok(Self {
            normalizer: EntityNormalizer::new(config.normalizer.clone()),
            detector: detector_for(config.detection.method),
            classifier: RiskClassifier::new(config.risk)?,
            stats: StatsAggregator::new(config.stats.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, batch: &ExtractionBatch) -> KycGraphResult<PipelineOutput> {
        if batch.is_empty() {
            warn!("empty extraction batch");
        }
        info!(
            entities = batch.entities.len(),
            relationships = batch.relationships.len(),
            method = self.detector.method().as_str(),
            "starting analysis"
        );

        let (entities, mut diagnostics) = self.normalizer.normalize(&batch.entities);
        let outcome = GraphBuilder::new(entities).build(&batch.relationships)?;
        diagnostics.extend(outcome.diagnostics);
        let graph = outcome.graph;

        let partition = self.detector.detect(&graph)?;
        info!(
            communities = partition.len(),
            modularity = partition.modularity,
            merges = partition.merges.len(),
            "detected communities"
        );

        let assessments = self.classifier.classify_all(&partition.communities);
        let high = assessments
            .iter()
            .filter(|a| a.risk_level == RiskLevel::High)
            .count();
        info!(
            assessed = assessments.len(),
            high_risk = high,
            dropped = diagnostics.total_dropped(),
            "classified communities"
        );

        let record = self
            .stats
            .aggregate(&graph, &partition, &assessments, diagnostics)?;

        Ok(PipelineOutput {
            graph,
            partition,
            record,
        })
    }

    /// Run over independently produced batches, merged in the given order
    pub fn run_batches(
        &self,
        batches: impl IntoIterator<Item = ExtractionBatch>,
    ) -> KycGraphResult<PipelineOutput> {
        self.run(&ExtractionBatch::merge(batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycgraph_core::{
        DetectionMethod, EntityMention, EntityType, KycGraphError, RelationType,
        RelationshipMention, RiskThresholds,
    };

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let config = PipelineConfig {
            risk: RiskThresholds {
                medium_size: 80,
                ..RiskThresholds::default()
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(KycGraphError::Configuration(_))
        ));
    }

    #[test]
    fn test_batches_merge_before_normalization() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let first = ExtractionBatch::new(
            vec![EntityMention::new("Acme Ltd", EntityType::Company)],
            vec![RelationshipMention::new("Acme Ltd", "John Doe", RelationType::Business)],
        );
        // The relationship above only resolves once this batch is merged in
        let second = ExtractionBatch::new(
            vec![
                EntityMention::new("John Doe", EntityType::Person),
                EntityMention::new("ACME LTD.", EntityType::Other),
            ],
            vec![],
        );

        let output = pipeline.run_batches([first, second]).unwrap();
        assert_eq!(output.graph.node_count(), 2);
        assert_eq!(output.graph.edge_count(), 1);
        assert!(output.record.diagnostics.is_clean());
    }

    #[test]
    fn test_detection_method_follows_config() {
        let mut config = PipelineConfig::default();
        config.detection.method = DetectionMethod::ConnectedComponents;
        let pipeline = Pipeline::new(config).unwrap();

        let output = pipeline.run(&ExtractionBatch::default()).unwrap();
        assert_eq!(output.partition.method, DetectionMethod::ConnectedComponents);
        assert_eq!(
            output.record.graph_stats.detection_method,
            DetectionMethod::ConnectedComponents
        );
    }
}
