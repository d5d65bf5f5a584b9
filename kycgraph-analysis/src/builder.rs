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

//! Graph construction from relationship mentions

use crate::graph::{Edge, EdgeKey, KnowledgeGraph, MAX_TOTAL_WEIGHT};
use crate::normalizer::EntitySet;
use kycgraph_core::{
    Diagnostics, DropKind, EntityId, EntityType, KycGraphError, KycGraphResult,
    RelationshipMention,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Result of a build: the finished graph and everything that was left out
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub graph: KnowledgeGraph,
    pub diagnostics: Diagnostics,
}

/// Builds a [`KnowledgeGraph`] from a complete entity set
pub struct GraphBuilder {
    entities: EntitySet,
}

impl GraphBuilder {
    /// Takes ownership of the normalized entities, so edges can only be
    /// added once normalization has finished.
    pub fn new(entities: EntitySet) -> Self {
        Self { entities }
    }

    /// Resolve, validate and collapse every relationship mention.
    ///
    /// Bad records are dropped and counted; only a broken graph invariant
    /// is returned as an error.
    pub fn build(self, relationships: &[RelationshipMention]) -> KycGraphResult<BuildOutcome> {
        let mut diagnostics = Diagnostics::new();
        let mut edges: BTreeMap<EdgeKey, Edge> = BTreeMap::new();
        let mut total_weight = 0u64;

        for (index, mention) in relationships.iter().enumerate() {
            let (source, target) = match self.resolve(mention) {
                Ok(endpoints) => endpoints,
                Err((kind, e)) => {
                    diagnostics.record(kind, index, &e);
                    continue;
                }
            };

            let Some(next_total) = total_weight
                .checked_add(mention.weight)
                .filter(|&total| total <= MAX_TOTAL_WEIGHT)
            else {
                let e = KycGraphError::Validation(format!(
                    "weight {} pushes total edge weight past {MAX_TOTAL_WEIGHT}",
                    mention.weight
                ));
                diagnostics.record(DropKind::InvalidRelationship, index, &e);
                continue;
            };
            total_weight = next_total;

            let key = EdgeKey::new(source.clone(), target.clone());
            let edge = edges
                .entry(key)
                .and_modify(|edge| edge.observe(mention.relation, mention.weight))
                .or_insert_with(|| {
                    Edge::observed(source, target, mention.relation, mention.weight)
                });
            edge.add_evidence(&mention.evidence);
        }

        let graph = KnowledgeGraph::new(self.entities.into_entities(), edges)?;

        if graph.node_count() > 0 && graph.edge_count() == 0 {
            warn!(nodes = graph.node_count(), "graph has no edges");
        }
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            total_weight = graph.total_weight(),
            dropped = diagnostics.dropped_edges(),
            "built entity graph"
        );

        Ok(BuildOutcome { graph, diagnostics })
    }

    fn resolve(
        &self,
        mention: &RelationshipMention,
    ) -> Result<(EntityId, EntityId), (DropKind, KycGraphError)> {
        if mention.source.trim().is_empty() || mention.target.trim().is_empty() {
            return Err((
                DropKind::InvalidRelationship,
                KycGraphError::Validation("relationship endpoint name is empty".to_string()),
            ));
        }
        if mention.weight == 0 {
            return Err((
                DropKind::InvalidRelationship,
                KycGraphError::Validation(format!(
                    "relationship {} -> {} has no positive integer weight",
                    mention.source, mention.target
                )),
            ));
        }

        let source = self.lookup(&mention.source, mention.source_type)?;
        let target = self.lookup(&mention.target, mention.target_type)?;

        if source == target {
            return Err((
                DropKind::SelfLoop,
                KycGraphError::Validation(format!(
                    "relationship {} -> {} resolves to a single entity {source}",
                    mention.source, mention.target
                )),
            ));
        }

        Ok((source, target))
    }

    fn lookup(
        &self,
        raw: &str,
        hint: Option<EntityType>,
    ) -> Result<EntityId, (DropKind, KycGraphError)> {
        self.entities
            .resolve(raw, hint)
            .map(|entity| entity.id.clone())
            .ok_or_else(|| {
                (
                    DropKind::UnresolvedRelationship,
                    KycGraphError::Referential(format!("unknown entity '{raw}'")),
                )
            })
    }
}
