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

//! Community Detection
//!
//! Partitions a finished [`KnowledgeGraph`] into communities.
//!
//! ## Modularity
//!
//! Q = (1/2m) * Σc[Lc - Dc²/(2m)]
//!
//! Where:
//! - m = total edge weight
//! - Lc = Σ Aij over ordered member pairs of c (twice the internal weight)
//! - Dc = total weighted degree of c's members
//!
//! With integer weights every term is an exact rational over 4m², so
//! partitions are compared and reported without accumulated rounding.

mod components;
mod greedy;

pub use components::ConnectedComponents;
pub use greedy::GreedyModularity;

use crate::graph::KnowledgeGraph;
use kycgraph_core::{Community, DetectionMethod, EntityId, KycGraphError, KycGraphResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A community detection algorithm
pub trait CommunityDetector: Send + Sync {
    fn method(&self) -> DetectionMethod;

    /// Partition every node of the graph
    fn detect(&self, graph: &KnowledgeGraph) -> KycGraphResult<Partition>;
}

/// Detector for a configured method
pub fn detector_for(method: DetectionMethod) -> Box<dyn CommunityDetector> {
    match method {
        DetectionMethod::GreedyModularity => Box::new(GreedyModularity::new()),
        DetectionMethod::ConnectedComponents => Box::new(ConnectedComponents::new()),
    }
}

/// One accepted agglomeration step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStep {
    /// Label (smallest node index) of the surviving community
    pub lo: usize,
    /// Label of the absorbed community
    pub hi: usize,
    pub delta_q: f64,
    /// Modularity after the merge
    pub modularity: f64,
}

/// Complete assignment of nodes to communities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub method: DetectionMethod,
    /// Ordered by community id, ids ascending by label
    pub communities: Vec<Community>,
    pub modularity: f64,
    /// Empty for non-agglomerative detectors
    pub merges: Vec<MergeStep>,
    /// Node position -> community id
    #[serde(skip)]
    assignment: Vec<u32>,
}

impl Partition {
    /// Build a partition from groups of node positions.
    ///
    /// Groups are verified to cover every node exactly once, then ordered by
    /// their smallest member and numbered from 0.
    pub fn from_groups(
        graph: &KnowledgeGraph,
        method: DetectionMethod,
        groups: Vec<Vec<usize>>,
        merges: Vec<MergeStep>,
    ) -> KycGraphResult<Self> {
        verify_partition(graph.node_count(), &groups)?;

        let mut groups: Vec<Vec<usize>> = groups.into_iter().filter(|g| !g.is_empty()).collect();
        for group in &mut groups {
            group.sort_unstable();
        }
        groups.sort_unstable_by_key(|g| g[0]);

        let mut assignment = vec![0u32; graph.node_count()];
        for (id, group) in groups.iter().enumerate() {
            for &node in group {
                assignment[node] = id as u32;
            }
        }

        let mut internal = vec![0u64; groups.len()];
        let mut external = vec![0u64; groups.len()];
        for (key, edge) in graph.edges() {
            let (Some(a), Some(b)) = (graph.position(&key.a), graph.position(&key.b)) else {
                continue;
            };
            let (ca, cb) = (assignment[a] as usize, assignment[b] as usize);
            if ca == cb {
                internal[ca] += edge.weight;
            } else {
                external[ca] += edge.weight;
                external[cb] += edge.weight;
            }
        }

        let m = graph.total_weight();
        let mut q_numerator: i128 = 0;
        let communities: Vec<Community> = groups
            .iter()
            .enumerate()
            .map(|(id, group)| {
                let degree_sum: u64 = group.iter().map(|&i| graph.degree(i)).sum();
                let numerator = contribution_numerator(m, internal[id], degree_sum);
                q_numerator += numerator;
                Community {
                    id: id as u32,
                    members: group
                        .iter()
                        .map(|&i| graph.entities()[i].id.clone())
                        .collect(),
                    internal_edge_weight: internal[id],
                    external_edge_weight: external[id],
                    degree_sum,
                    modularity: ratio(numerator, m),
                }
            })
            .collect();

        Ok(Self {
            method,
            communities,
            modularity: ratio(q_numerator, m),
            merges,
            assignment,
        })
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Community id per node position
    pub fn assignment(&self) -> &[u32] {
        &self.assignment
    }

    pub fn community(&self, id: u32) -> Option<&Community> {
        self.communities.get(id as usize)
    }

    /// Entity id -> community id
    pub fn community_index(&self) -> BTreeMap<EntityId, u32> {
        self.communities
            .iter()
            .flat_map(|c| c.members.iter().map(move |member| (member.clone(), c.id)))
            .collect()
    }

    /// Community id -> member entity ids
    pub fn membership(&self) -> BTreeMap<u32, Vec<EntityId>> {
        self.communities
            .iter()
            .map(|c| (c.id, c.members.clone()))
            .collect()
    }
}

/// Check that groups of node positions cover `0..node_count` exactly once
pub fn verify_partition(node_count: usize, groups: &[Vec<usize>]) -> KycGraphResult<()> {
    let mut seen = vec![false; node_count];
    for &node in groups.iter().flatten() {
        match seen.get_mut(node) {
            None => {
                return Err(KycGraphError::InvariantViolation(format!(
                    "partition references node {node} outside 0..{node_count}"
                )))
            }
            Some(true) => {
                return Err(KycGraphError::InvariantViolation(format!(
                    "node {node} assigned to more than one community"
                )))
            }
            Some(slot) => *slot = true,
        }
    }

    match seen.iter().position(|covered| !covered) {
        Some(node) => Err(KycGraphError::InvariantViolation(format!(
            "node {node} is not assigned to any community"
        ))),
        None => Ok(()),
    }
}

/// Evaluate Q for an arbitrary assignment (node position -> community label)
/// directly from the definition.
pub fn modularity(graph: &KnowledgeGraph, assignment: &[u32]) -> f64 {
    let m = graph.total_weight();
    if m == 0 {
        return 0.0;
    }

    let mut ordered_pair_weight: BTreeMap<u32, u64> = BTreeMap::new();
    let mut degree_sum: BTreeMap<u32, u64> = BTreeMap::new();

    for (i, &label) in assignment.iter().enumerate() {
        *degree_sum.entry(label).or_default() += graph.degree(i);
        for (&j, &weight) in graph.neighbors(i) {
            if assignment.get(j) == Some(&label) {
                *ordered_pair_weight.entry(label).or_default() += weight;
            }
        }
    }

    let two_m = 2.0 * m as f64;
    degree_sum
        .iter()
        .map(|(label, &d)| {
            let l = ordered_pair_weight.get(label).copied().unwrap_or(0) as f64;
            l - (d as f64 * d as f64) / two_m
        })
        .sum::<f64>()
        / two_m
}

/// 4m·Ic − Dc², this community's share of Q scaled by 4m²
pub(crate) fn contribution_numerator(m: u64, internal: u64, degree_sum: u64) -> i128 {
    4 * m as i128 * internal as i128 - degree_sum as i128 * degree_sum as i128
}

/// numerator / 4m², or 0 for an edgeless graph
pub(crate) fn ratio(numerator: i128, m: u64) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let denominator = 4.0 * m as f64 * m as f64;
    numerator as f64 / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::normalizer::EntityNormalizer;
    use kycgraph_core::{EntityMention, EntityType, RelationType, RelationshipMention};

    fn path_graph() -> KnowledgeGraph {
        let entities = EntityNormalizer::default()
            .normalize(&[
                EntityMention::new("A", EntityType::Company),
                EntityMention::new("B", EntityType::Company),
                EntityMention::new("C", EntityType::Person),
                EntityMention::new("D", EntityType::Person),
            ])
            .0;
        GraphBuilder::new(entities)
            .build(&[
                RelationshipMention::new("A", "B", RelationType::Ownership).with_weight(2),
                RelationshipMention::new("B", "C", RelationType::Business),
            ])
            .unwrap()
            .graph
    }

    #[test]
    fn test_verify_partition() {
        assert!(verify_partition(3, &[vec![0, 2], vec![1]]).is_ok());
        assert!(matches!(
            verify_partition(3, &[vec![0, 1]]),
            Err(KycGraphError::InvariantViolation(_))
        ));
        assert!(verify_partition(3, &[vec![0, 1], vec![1, 2]]).is_err());
        assert!(verify_partition(2, &[vec![0, 1, 2]]).is_err());
    }

    #[test]
    fn test_from_groups_orders_and_aggregates() {
        let graph = path_graph();
        let partition = Partition::from_groups(
            &graph,
            DetectionMethod::GreedyModularity,
            vec![vec![3], vec![2, 1, 0]],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(partition.len(), 2);
        let first = &partition.communities[0];
        assert_eq!(first.members.len(), 3);
        assert_eq!(first.members[0].as_str(), "company:a");
        assert_eq!(first.internal_edge_weight, 3);
        assert_eq!(first.external_edge_weight, 0);
        assert_eq!(first.degree_sum, 6);
        assert_eq!(partition.assignment(), &[0, 0, 0, 1]);
        assert_eq!(partition.community_index()[&EntityId::from("person:d")], 1);
    }

    #[test]
    fn test_exact_and_explicit_modularity_agree() {
        let graph = path_graph();
        for groups in [
            vec![vec![0], vec![1], vec![2], vec![3]],
            vec![vec![0, 1], vec![2], vec![3]],
            vec![vec![0, 1, 2], vec![3]],
            vec![vec![0, 2], vec![1, 3]],
        ] {
            let partition = Partition::from_groups(
                &graph,
                DetectionMethod::GreedyModularity,
                groups,
                Vec::new(),
            )
            .unwrap();
            let explicit = modularity(&graph, partition.assignment());
            assert!((partition.modularity - explicit).abs() < 1e-12);

            let summed: f64 = partition.communities.iter().map(|c| c.modularity).sum();
            assert!((partition.modularity - summed).abs() < 1e-12);
        }
    }

    #[test]
    fn test_detector_for_method() {
        assert_eq!(
            detector_for(DetectionMethod::ConnectedComponents).method(),
            DetectionMethod::ConnectedComponents
        );
        assert_eq!(
            detector_for(DetectionMethod::GreedyModularity).method(),
            DetectionMethod::GreedyModularity
        );
    }
}
