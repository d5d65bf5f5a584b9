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

//! Integration tests for the analysis pipeline

use kycgraph_analysis::{modularity, Pipeline};
use kycgraph_core::{
    DetectionMethod, DropKind, EntityId, EntityMention, EntityType, ExtractionBatch,
    PipelineConfig, RelationType, RelationshipMention, RiskLevel, RiskRule,
};
use std::io::Write;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn default_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::default()).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

fn abc_batch() -> ExtractionBatch {
    ExtractionBatch::new(
        vec![
            EntityMention::new("A", EntityType::Company),
            EntityMention::new("B", EntityType::Company),
            EntityMention::new("C", EntityType::Person),
        ],
        vec![
            RelationshipMention::new("A", "B", RelationType::Ownership),
            RelationshipMention::new("B", "C", RelationType::Business),
            RelationshipMention::new("A", "B", RelationType::Ownership),
        ],
    )
}

/// Exact modularity trajectory for a weighted three-node path
#[test]
fn test_three_node_scenario() {
    init_tracing();
    let output = default_pipeline().run(&abc_batch()).unwrap();
    let graph = &output.graph;

    let a = EntityId::from("company:a");
    let b = EntityId::from("company:b");
    let c = EntityId::from("person:c");

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    let ab = graph.edge(&a, &b).unwrap();
    assert_eq!(ab.weight, 2);
    assert_eq!(ab.relation_type, RelationType::Ownership);
    let bc = graph.edge(&b, &c).unwrap();
    assert_eq!(bc.weight, 1);
    assert_eq!(bc.relation_type, RelationType::Business);

    assert_eq!(graph.total_weight(), 3);
    assert_eq!(graph.degrees(), &[2, 3, 1]);
    assert_close(modularity(graph, &[0, 1, 2]), -14.0 / 36.0);

    let merges = &output.partition.merges;
    assert_eq!(merges.len(), 2);
    assert_eq!((merges[0].lo, merges[0].hi), (0, 1));
    assert_close(merges[0].delta_q, 1.0 / 3.0);
    assert_close(merges[0].modularity, -1.0 / 18.0);
    assert_eq!((merges[1].lo, merges[1].hi), (0, 2));
    assert_close(merges[1].delta_q, 1.0 / 18.0);
    assert_close(merges[1].modularity, 0.0);

    assert_eq!(output.partition.len(), 1);
    assert_close(output.partition.modularity, 0.0);
    assert_eq!(output.record.communities[&0], vec![a, b, c]);
}

#[test]
fn test_empty_input() {
    init_tracing();
    let output = default_pipeline().run(&ExtractionBatch::default()).unwrap();

    assert!(output.graph.is_empty());
    assert!(output.partition.is_empty());
    assert!(output.record.communities.is_empty());
    assert!(output.record.risk_assessments.is_empty());
    assert_eq!(output.record.graph_stats.node_count, 0);
    assert_eq!(output.record.graph_stats.modularity, 0.0);
    assert!(output.record.diagnostics.is_clean());
}

/// 60 entities with 90% of all pairs connected
#[test]
fn test_dense_large_community_is_high_risk() {
    init_tracing();
    let names: Vec<String> = (0..60).map(|i| format!("Entity {i:02}")).collect();
    let entities = names
        .iter()
        .map(|n| EntityMention::new(n.as_str(), EntityType::Company))
        .collect();

    let mut relationships = Vec::new();
    let mut pair = 0;
    for i in 0..60 {
        for j in (i + 1)..60 {
            // Skip every tenth pair: 177 of 1770
            if pair % 10 != 9 {
                relationships.push(RelationshipMention::new(
                    names[i].as_str(),
                    names[j].as_str(),
                    RelationType::Financial,
                ));
            }
            pair += 1;
        }
    }

    let mut config = PipelineConfig::default();
    config.detection.method = DetectionMethod::ConnectedComponents;
    let output = Pipeline::new(config)
        .unwrap()
        .run(&ExtractionBatch::new(entities, relationships))
        .unwrap();

    assert_eq!(output.partition.len(), 1);
    let assessment = &output.record.risk_assessments[0];
    assert_eq!(assessment.entity_count, 60);
    assert_close(assessment.density, 0.9);
    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert_eq!(
        assessment.rationale,
        vec![RiskRule::HighSize, RiskRule::HighDensity]
    );
    assert_eq!(
        output.record.graph_stats.risk_distribution[&RiskLevel::High],
        1
    );
}

#[test]
fn test_missing_entity_is_dropped_not_fatal() {
    init_tracing();
    let mut batch = abc_batch();
    batch.relationships.push(RelationshipMention::new(
        "A",
        "Shell Co Nobody Declared",
        RelationType::Ownership,
    ));

    let output = default_pipeline().run(&batch).unwrap();
    let diagnostics = &output.record.diagnostics;
    assert_eq!(diagnostics.unresolved_relationships, 1);
    assert_eq!(diagnostics.total_dropped(), 1);
    assert_eq!(diagnostics.records[0].index, 3);
    assert_eq!(output.graph.edge_count(), 2);
}

/// A 4-cycle has four equal gains; the lowest label pair goes first
#[test]
fn test_tie_break_on_four_cycle() {
    init_tracing();
    let batch = ExtractionBatch::new(
        ["a", "b", "c", "d"]
            .iter()
            .map(|n| EntityMention::new(*n, EntityType::Company))
            .collect(),
        vec![
            RelationshipMention::new("a", "b", RelationType::Business),
            RelationshipMention::new("b", "c", RelationType::Business),
            RelationshipMention::new("c", "d", RelationType::Business),
            RelationshipMention::new("d", "a", RelationType::Business),
        ],
    );

    let output = default_pipeline().run(&batch).unwrap();
    let merges = &output.partition.merges;
    assert_eq!((merges[0].lo, merges[0].hi), (0, 1));
    assert_eq!((merges[1].lo, merges[1].hi), (2, 3));
    assert_eq!(merges.len(), 2);
    assert_eq!(output.partition.assignment(), &[0, 0, 1, 1]);
    assert_close(output.partition.modularity, 0.0);
}

#[test]
fn test_json_in_json_out() {
    init_tracing();
    let batch = ExtractionBatch::from_json_str(
        r#"{
            "entities": [
                {"name": "Orion Holdings Ltd", "type": "HOLDING_COMPANY",
                 "evidence": ["kyc.pdf:p1"]},
                {"name": "orion holdings ltd.", "type": "UNKNOWN"},
                {"name": "Maria Ilves", "type": "BENEFICIAL_OWNER"},
                {"name": "Tallinn", "type": "CITY"},
                {"name": "   "}
            ],
            "relationships": [
                {"source": "Maria Ilves", "target": "Orion Holdings Ltd",
                 "relation": "beneficial_owner_of", "weight": 2},
                {"source": "Orion Holdings Ltd", "target": "Tallinn", "relation": "registered_in"},
                {"source": "Maria Ilves", "target": "Maria Ilves", "relation": "alias"}
            ]
        }"#,
    )
    .unwrap();

    let output = default_pipeline().run(&batch).unwrap();
    let record = &output.record;

    assert_eq!(record.graph_stats.node_count, 3);
    assert_eq!(record.diagnostics.invalid_entities, 1);
    assert_eq!(record.diagnostics.self_loops, 1);
    assert_eq!(
        record.graph_stats.relation_type_distribution[&RelationType::Ownership],
        1
    );

    let json = record.to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    for key in ["graph_stats", "communities", "risk_assessments", "diagnostics"] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(
        value["graph_stats"]["top_entities"][0]["id"],
        "company:orion_holdings_ltd"
    );
}

/// One bad record never costs the rest of the batch
#[test]
fn test_malformed_json_records_dropped_one_by_one() {
    init_tracing();
    let batch = ExtractionBatch::from_json_str(
        r#"{
            "entities": [
                {"name": "Orion Holdings Ltd", "type": "COMPANY"},
                {"type": "PERSON"},
                {"name": null},
                42,
                {"name": "Maria Ilves", "type": "UBO"},
                {"name": "Tallinn", "type": "CITY"}
            ],
            "relationships": [
                {"source": null, "target": "Orion Holdings Ltd"},
                {"source": "Maria Ilves", "target": "Orion Holdings Ltd", "weight": 1.5},
                {"source": "Maria Ilves", "target": "Orion Holdings Ltd", "relation": "owns",
                 "weight": 2},
                "garbage",
                {"source": "Orion Holdings Ltd", "target": "Tallinn", "weight": -1},
                {"source": "Orion Holdings Ltd", "target": "Tallinn", "weight": null}
            ]
        }"#,
    )
    .unwrap();

    let output = default_pipeline().run(&batch).unwrap();
    let diagnostics = &output.record.diagnostics;

    assert_eq!(output.graph.node_count(), 3);
    assert_eq!(output.graph.edge_count(), 2);
    assert_eq!(output.graph.total_weight(), 3);

    let dropped = |kind: DropKind| -> Vec<usize> {
        diagnostics
            .records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.index)
            .collect()
    };
    assert_eq!(diagnostics.invalid_entities, 3);
    assert_eq!(dropped(DropKind::InvalidEntity), vec![1, 2, 3]);
    assert_eq!(diagnostics.invalid_relationships, 4);
    assert_eq!(dropped(DropKind::InvalidRelationship), vec![0, 1, 3, 4]);
}

#[test]
fn test_config_file_drives_thresholds() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[risk]\nhigh_size = 3\nmedium_size = 2\nhigh_density = 0.95\nmedium_density = 0.9"
    )
    .unwrap();

    let config = PipelineConfig::from_file(file.path()).unwrap();
    let output = Pipeline::new(config).unwrap().run(&abc_batch()).unwrap();

    // 3 members, 3 units of weight over 3 pairs
    let assessment = &output.record.risk_assessments[0];
    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert_eq!(
        assessment.rationale,
        vec![RiskRule::HighSize, RiskRule::HighDensity]
    );
}

#[test]
fn test_repeated_runs_serialize_identically() {
    let pipeline = default_pipeline();
    let first = pipeline.run(&abc_batch()).unwrap().record.to_json_pretty().unwrap();
    let second = pipeline.run(&abc_batch()).unwrap().record.to_json_pretty().unwrap();
    assert_eq!(first, second);
}
