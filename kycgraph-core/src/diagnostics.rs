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

//! Dropped-record diagnostics
//!
//! Recoverable errors never abort a run. Each one becomes a [`DroppedRecord`]
//! and bumps the matching counter so the caller can report exactly what was
//! left out of the graph.

use crate::error::KycGraphError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a record was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropKind {
    /// Entity mention failed validation
    InvalidEntity,
    /// Relationship mention failed validation
    InvalidRelationship,
    /// Relationship endpoint did not resolve to an entity
    UnresolvedRelationship,
    /// Both endpoints resolved to the same entity
    SelfLoop,
}

/// A single dropped input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub kind: DropKind,
    /// Position of the record in its input sequence
    pub index: usize,
    pub message: String,
}

/// Counters plus the full list of dropped records for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub invalid_entities: usize,
    pub invalid_relationships: usize,
    pub unresolved_relationships: usize,
    pub self_loops: usize,
    pub records: Vec<DroppedRecord>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dropped input. Only recoverable errors belong here.
    pub fn record(&mut self, kind: DropKind, index: usize, error: &KycGraphError) {
        debug_assert!(error.is_recoverable(), "fatal error recorded as a drop: {error}");
        debug!(?kind, index, %error, "dropping record");

        match kind {
            DropKind::InvalidEntity => self.invalid_entities += 1,
            DropKind::InvalidRelationship => self.invalid_relationships += 1,
            DropKind::UnresolvedRelationship => self.unresolved_relationships += 1,
            DropKind::SelfLoop => self.self_loops += 1,
        }

        self.records.push(DroppedRecord {
            kind,
            index,
            message: error.to_string(),
        });
    }

    /// Fold another stage's diagnostics into this one
    pub fn extend(&mut self, other: Diagnostics) {
        self.invalid_entities += other.invalid_entities;
        self.invalid_relationships += other.invalid_relationships;
        self.unresolved_relationships += other.unresolved_relationships;
        self.self_loops += other.self_loops;
        self.records.extend(other.records);
    }

    /// Relationships dropped for any reason
    pub fn dropped_edges(&self) -> usize {
        self.invalid_relationships + self.unresolved_relationships + self.self_loops
    }

    pub fn total_dropped(&self) -> usize {
        self.records.len()
    }

    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }
}
