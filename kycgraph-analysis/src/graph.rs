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

//! Entity Knowledge Graph
//!
//! Simple, undirected, weighted graph over deduplicated entities.
//! Uses adjacency maps keyed by node position for traversal and supports:
//! - Node position lookup by entity ID
//! - Edge lookup by unordered pair
//! - Weighted degree queries for clustering and statistics
//!
//! A graph is only ever produced by [`crate::GraphBuilder`] and cannot be
//! mutated afterwards.

use kycgraph_core::{Entity, EntityId, KycGraphError, KycGraphResult, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Upper bound on the total edge weight of one graph.
///
/// Keeps every modularity numerator inside `i128`.
pub const MAX_TOTAL_WEIGHT: u64 = 1 << 48;

/// Unordered entity pair, stored with `a < b`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub a: EntityId,
    pub b: EntityId,
}

impl EdgeKey {
    pub fn new(x: EntityId, y: EntityId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

/// Collapsed edge between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Endpoint in the orientation of the first observation; use the
    /// [`EdgeKey`] for anything that must not depend on input order
    pub source: EntityId,
    pub target: EntityId,
    /// Sum of observation weights
    pub weight: u64,
    /// Most frequently observed relation type
    pub relation_type: RelationType,
    /// Observations per relation type, in first-seen order
    pub relation_counts: Vec<(RelationType, u64)>,
    pub evidence: Vec<String>,
    /// Number of relationship records collapsed into this edge
    pub observations: u64,
}

impl Edge {
    pub(crate) fn observed(
        source: EntityId,
        target: EntityId,
        relation: RelationType,
        weight: u64,
    ) -> Self {
        Self {
            source,
            target,
            weight,
            relation_type: relation,
            relation_counts: vec![(relation, 1)],
            evidence: Vec::new(),
            observations: 1,
        }
    }

    /// Fold one more observation of the same unordered pair
    pub(crate) fn observe(&mut self, relation: RelationType, weight: u64) {
        self.weight += weight;
        self.observations += 1;
        match self.relation_counts.iter_mut().find(|(r, _)| *r == relation) {
            Some((_, count)) => *count += 1,
            None => self.relation_counts.push((relation, 1)),
        }

        // Strictly greater only, so the earliest type keeps a tie
        let mut best = self.relation_counts[0];
        for &(relation, count) in &self.relation_counts[1..] {
            if count > best.1 {
                best = (relation, count);
            }
        }
        self.relation_type = best.0;
    }

    pub(crate) fn add_evidence(&mut self, evidence: &[String]) {
        for item in evidence {
            if !self.evidence.contains(item) {
                self.evidence.push(item.clone());
            }
        }
    }
}

/// Entity knowledge graph
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    /// Nodes in insertion order
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    edges: BTreeMap<EdgeKey, Edge>,
    /// Node position -> neighbour position -> edge weight
    adjacency: Vec<BTreeMap<usize, u64>>,
    /// Weighted degree per node
    degrees: Vec<u64>,
    total_weight: u64,
}

impl KnowledgeGraph {
    pub(crate) fn new(
        entities: Vec<Entity>,
        edges: BTreeMap<EdgeKey, Edge>,
    ) -> KycGraphResult<Self> {
        let index: HashMap<EntityId, usize> = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        if index.len() != entities.len() {
            return Err(KycGraphError::InvariantViolation(
                "duplicate entity id in graph nodes".to_string(),
            ));
        }

        let mut adjacency = vec![BTreeMap::new(); entities.len()];
        let mut degrees = vec![0u64; entities.len()];
        let mut total_weight = 0u64;

        for (key, edge) in &edges {
            let (Some(&a), Some(&b)) = (index.get(&key.a), index.get(&key.b)) else {
                return Err(KycGraphError::InvariantViolation(format!(
                    "edge {} - {} references a missing node",
                    key.a, key.b
                )));
            };
            if a == b {
                return Err(KycGraphError::InvariantViolation(format!(
                    "self-loop on {}",
                    key.a
                )));
            }
            adjacency[a].insert(b, edge.weight);
            adjacency[b].insert(a, edge.weight);
            degrees[a] += edge.weight;
            degrees[b] += edge.weight;
            total_weight += edge.weight;
        }

        Ok(Self {
            entities,
            index,
            edges,
            adjacency,
            degrees,
            total_weight,
        })
    }

    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of collapsed edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Total edge weight `m`
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in node insertion order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Node insertion index of an entity
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &Edge)> {
        self.edges.iter()
    }

    pub fn edge(&self, x: &EntityId, y: &EntityId) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(x.clone(), y.clone()))
    }

    /// Neighbours of a node with the connecting edge weight
    pub fn neighbors(&self, position: usize) -> &BTreeMap<usize, u64> {
        &self.adjacency[position]
    }

    /// Weighted degree of a node
    pub fn degree(&self, position: usize) -> u64 {
        self.degrees[position]
    }

    pub fn degrees(&self) -> &[u64] {
        &self.degrees
    }

    /// Unordered pair -> collapsed weight
    pub fn edge_weights(&self) -> BTreeMap<EdgeKey, u64> {
        self.edges
            .iter()
            .map(|(key, edge)| (key.clone(), edge.weight))
            .collect()
    }
}
