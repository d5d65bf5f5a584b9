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

//! Graph statistics and the structured analysis record
//!
//! The [`AnalysisRecord`] is the only thing handed to the reporting side. Its
//! field names are stable and every map is ordered, so two runs over the same
//! input serialize byte-for-byte identically.

use crate::community::Partition;
use crate::graph::KnowledgeGraph;
use kycgraph_core::{
    DetectionMethod, Diagnostics, EntityId, EntityType, KycGraphError, KycGraphResult,
    RelationType, RiskAssessment, RiskLevel, StatsConfig,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Entity ranked by weighted degree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub weighted_degree: u64,
}

/// Internal edge, endpoints in entity id order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEdge {
    pub source: EntityId,
    pub target: EntityId,
    pub weight: u64,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySizeSummary {
    pub average: f64,
    pub largest: usize,
    pub smallest: usize,
}

/// Per-community digest for the reporting collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub community_id: u32,
    pub entity_count: usize,
    pub risk_level: RiskLevel,
    pub density: f64,
    pub internal_edge_weight: u64,
    pub external_edge_weight: u64,
    pub modularity: f64,
    /// Heaviest members by weighted degree
    pub key_entities: Vec<RankedEntity>,
    /// Heaviest internal edges
    pub sample_edges: Vec<SampleEdge>,
}

/// Graph statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    /// Edges after collapsing duplicate pairs
    pub edge_count: usize,
    pub total_edge_weight: u64,
    /// Average number of neighbours per entity
    pub avg_degree: f64,
    /// Edges over possible pairs
    pub density: f64,
    pub detection_method: DetectionMethod,
    pub modularity: f64,
    pub community_count: usize,
    pub top_entities: Vec<RankedEntity>,
    pub community_sizes: CommunitySizeSummary,
    pub entity_type_distribution: BTreeMap<EntityType, usize>,
    pub relation_type_distribution: BTreeMap<RelationType, usize>,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub community_summaries: Vec<CommunitySummary>,
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub graph_stats: GraphStats,
    /// Community id -> member entity ids
    pub communities: BTreeMap<u32, Vec<EntityId>>,
    pub risk_assessments: Vec<RiskAssessment>,
    pub diagnostics: Diagnostics,
}

impl AnalysisRecord {
    pub fn to_json_pretty(&self) -> KycGraphResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> KycGraphResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    config: StatsConfig,
}

impl StatsAggregator {
    pub fn new(config: StatsConfig) -> Self {
        Self { config }
    }

    /// Fails with `InvariantViolation` unless every community has exactly
    /// one assessment.
    pub fn aggregate(
        &self,
        graph: &KnowledgeGraph,
        partition: &Partition,
        assessments: &[RiskAssessment],
        diagnostics: Diagnostics,
    ) -> KycGraphResult<AnalysisRecord> {
        let graph_stats = self.graph_stats(graph, partition, assessments)?;
        Ok(AnalysisRecord {
            graph_stats,
            communities: partition.membership(),
            risk_assessments: assessments.to_vec(),
            diagnostics,
        })
    }

    pub fn graph_stats(
        &self,
        graph: &KnowledgeGraph,
        partition: &Partition,
        assessments: &[RiskAssessment],
    ) -> KycGraphResult<GraphStats> {
        let matched = match_assessments(partition, assessments)?;
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();

        let avg_degree = if node_count > 0 {
            2.0 * edge_count as f64 / node_count as f64
        } else {
            0.0
        };
        let density = if node_count > 1 {
            edge_count as f64 / (node_count * (node_count - 1) / 2) as f64
        } else {
            0.0
        };

        let mut entity_type_distribution = BTreeMap::new();
        for entity in graph.entities() {
            *entity_type_distribution.entry(entity.entity_type).or_default() += 1;
        }

        let mut relation_type_distribution = BTreeMap::new();
        for (_, edge) in graph.edges() {
            *relation_type_distribution.entry(edge.relation_type).or_default() += 1;
        }

        let mut risk_distribution = BTreeMap::new();
        for assessment in assessments {
            *risk_distribution.entry(assessment.risk_level).or_default() += 1;
        }

        Ok(GraphStats {
            node_count,
            edge_count,
            total_edge_weight: graph.total_weight(),
            avg_degree,
            density,
            detection_method: partition.method,
            modularity: partition.modularity,
            community_count: partition.len(),
            top_entities: self.rank(graph, 0..node_count),
            community_sizes: size_summary(partition),
            entity_type_distribution,
            relation_type_distribution,
            risk_distribution,
            community_summaries: self.community_summaries(graph, partition, &matched),
        })
    }

    /// Top `top_k` of the given nodes; ties broken by entity id ascending
    fn rank(
        &self,
        graph: &KnowledgeGraph,
        nodes: impl IntoIterator<Item = usize>,
    ) -> Vec<RankedEntity> {
        let mut ranked: Vec<(Reverse<u64>, &EntityId, usize)> = nodes
            .into_iter()
            .map(|i| (Reverse(graph.degree(i)), &graph.entities()[i].id, i))
            .collect();
        ranked.sort_unstable();

        ranked
            .into_iter()
            .take(self.config.top_k)
            .map(|(Reverse(weighted_degree), _, i)| {
                let entity = &graph.entities()[i];
                RankedEntity {
                    id: entity.id.clone(),
                    name: entity.canonical_name.clone(),
                    entity_type: entity.entity_type,
                    weighted_degree,
                }
            })
            .collect()
    }

    /// `assessments` is aligned with `partition.communities`
    fn community_summaries(
        &self,
        graph: &KnowledgeGraph,
        partition: &Partition,
        assessments: &[&RiskAssessment],
    ) -> Vec<CommunitySummary> {
        let assignment = partition.assignment();

        // Internal edges bucketed by community
        let mut internal: Vec<Vec<SampleEdge>> = vec![Vec::new(); partition.len()];
        for (key, edge) in graph.edges() {
            let (Some(a), Some(b)) = (graph.position(&key.a), graph.position(&key.b)) else {
                continue;
            };
            if assignment[a] == assignment[b] {
                internal[assignment[a] as usize].push(SampleEdge {
                    source: key.a.clone(),
                    target: key.b.clone(),
                    weight: edge.weight,
                    relation_type: edge.relation_type,
                });
            }
        }

        partition
            .communities
            .iter()
            .zip(assessments)
            .zip(internal)
            .map(|((community, assessment), mut edges)| {
                // Stable sort keeps edge-key order among equal weights
                edges.sort_by_key(|e| Reverse(e.weight));
                edges.truncate(self.config.sample_edges);

                let members = community.members.iter().filter_map(|id| graph.position(id));

                CommunitySummary {
                    community_id: community.id,
                    entity_count: community.entity_count(),
                    risk_level: assessment.risk_level,
                    density: assessment.density,
                    internal_edge_weight: community.internal_edge_weight,
                    external_edge_weight: community.external_edge_weight,
                    modularity: community.modularity,
                    key_entities: self.rank(graph, members),
                    sample_edges: edges,
                }
            })
            .collect()
    }
}

/// Pair each community with its assessment, in community order
fn match_assessments<'a>(
    partition: &Partition,
    assessments: &'a [RiskAssessment],
) -> KycGraphResult<Vec<&'a RiskAssessment>> {
    let mut by_id: BTreeMap<u32, &RiskAssessment> = BTreeMap::new();
    for assessment in assessments {
        if by_id.insert(assessment.community_id, assessment).is_some() {
            return Err(KycGraphError::InvariantViolation(format!(
                "community {} assessed more than once",
                assessment.community_id
            )));
        }
    }
    if by_id.len() != partition.len() {
        return Err(KycGraphError::InvariantViolation(format!(
            "{} risk assessments for {} communities",
            by_id.len(),
            partition.len()
        )));
    }

    partition
        .communities
        .iter()
        .map(|community| {
            by_id.get(&community.id).copied().ok_or_else(|| {
                KycGraphError::InvariantViolation(format!(
                    "community {} has no risk assessment",
                    community.id
                ))
            })
        })
        .collect()
}

fn size_summary(partition: &Partition) -> CommunitySizeSummary {
    let sizes: Vec<usize> = partition.communities.iter().map(|c| c.entity_count()).collect();
    if sizes.is_empty() {
        return CommunitySizeSummary::default();
    }
    CommunitySizeSummary {
        average: sizes.iter().sum::<usize>() as f64 / sizes.len() as f64,
        largest: sizes.iter().copied().max().unwrap_or(0),
        smallest: sizes.iter().copied().min().unwrap_or(0),
    }
}
