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

//! Entity Resolution and Normalization
//!
//! Collapses noisy entity mentions into a deduplicated [`EntitySet`].
//!
//! Two mentions denote the same entity when their normalized names are equal
//! and their declared types are compatible. An `Other` mention is attached to
//! the specific type with the smallest entity id among those declared for the
//! same name anywhere in the batch. Endpoint resolution picks between
//! homonyms the same way, so reordering mentions never moves an edge.

use kycgraph_core::{
    Diagnostics, DropKind, Entity, EntityId, EntityMention, EntityType, KycGraphError,
    NormalizerConfig,
};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Case-fold, strip punctuation and collapse whitespace.
///
/// `"  ACME Holdings, Ltd. "` becomes `"acme holdings ltd"`.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deduplicated entities plus the indexes used to resolve relationship
/// endpoints.
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    entities: Vec<Entity>,
    by_id: HashMap<EntityId, usize>,
    /// Normalized surface form -> entity positions
    by_name: HashMap<String, Vec<usize>>,
}

impl EntitySet {
    fn from_entities(entities: Vec<Entity>) -> Self {
        let by_id = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, entity) in entities.iter().enumerate() {
            let forms = std::iter::once(&entity.canonical_name).chain(&entity.aliases);
            for form in forms {
                let candidates = by_name.entry(normalize_name(form)).or_default();
                if !candidates.contains(&i) {
                    candidates.push(i);
                }
            }
        }

        Self {
            entities,
            by_id,
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in first-seen order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.by_id.get(id).map(|&i| &self.entities[i])
    }

    /// Resolve a raw relationship endpoint.
    ///
    /// An exact entity id wins. Otherwise the name is normalized and looked
    /// up. A specific type hint keeps the compatible candidates and prefers
    /// the exact type. Remaining ties go to the smallest entity id.
    pub fn resolve(&self, raw: &str, hint: Option<EntityType>) -> Option<&Entity> {
        if let Some(entity) = self.get(&EntityId::from(raw.trim())) {
            return Some(entity);
        }

        let candidates = self
            .by_name
            .get(&normalize_name(raw))?
            .iter()
            .map(|&i| &self.entities[i]);
        match hint.filter(EntityType::is_specific) {
            Some(wanted) => candidates
                .filter(|e| e.entity_type.is_compatible(&wanted))
                .min_by(|x, y| {
                    (x.entity_type != wanted)
                        .cmp(&(y.entity_type != wanted))
                        .then_with(|| x.id.cmp(&y.id))
                }),
            None => candidates.min_by(|x, y| x.id.cmp(&y.id)),
        }
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

/// Entity normalizer
#[derive(Debug, Clone, Default)]
pub struct EntityNormalizer {
    config: NormalizerConfig,
}

impl EntityNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Deduplicate raw mentions.
    ///
    /// Mentions whose normalized name is empty or too short are dropped and
    /// recorded as [`DropKind::InvalidEntity`].
    pub fn normalize(&self, mentions: &[EntityMention]) -> (EntitySet, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        // Pass 1: validate, and note the specific type with the smallest id per name
        let mut valid: Vec<(String, &EntityMention)> = Vec::with_capacity(mentions.len());
        let mut specific_type: HashMap<String, EntityType> = HashMap::new();
        for (index, mention) in mentions.iter().enumerate() {
            let normalized = normalize_name(&mention.name);
            if let Err(e) = self.validate(&mention.name, &normalized) {
                diagnostics.record(DropKind::InvalidEntity, index, &e);
                continue;
            }
            if mention.entity_type.is_specific() {
                let declared = mention.entity_type;
                specific_type
                    .entry(normalized.clone())
                    .and_modify(|kept| {
                        // Same name, so the smaller tag is the smaller id
                        if declared.tag() < kept.tag() {
                            *kept = declared;
                        }
                    })
                    .or_insert(declared);
            }
            valid.push((normalized, mention));
        }

        // Pass 2: merge
        let mut entities: Vec<Entity> = Vec::new();
        let mut positions: HashMap<EntityId, usize> = HashMap::new();
        for (normalized, mention) in valid {
            let entity_type = if mention.entity_type.is_specific() {
                mention.entity_type
            } else {
                specific_type
                    .get(&normalized)
                    .copied()
                    .unwrap_or(EntityType::Other)
            };
            let id = EntityId::derive(entity_type, &normalized);

            match positions.get(&id) {
                Some(&i) => merge_into(&mut entities[i], mention),
                None => {
                    positions.insert(id.clone(), entities.len());
                    entities.push(new_entity(id, entity_type, mention));
                }
            }
        }

        info!(
            mentions = mentions.len(),
            entities = entities.len(),
            dropped = diagnostics.invalid_entities,
            "normalized entity mentions"
        );

        (EntitySet::from_entities(entities), diagnostics)
    }

    /// Feed already normalized entities back through the normalizer
    pub fn renormalize(&self, entities: &[Entity]) -> (EntitySet, Diagnostics) {
        let mentions: Vec<EntityMention> = entities.iter().map(EntityMention::from).collect();
        self.normalize(&mentions)
    }

    fn validate(&self, raw: &str, normalized: &str) -> Result<(), KycGraphError> {
        if normalized.is_empty() {
            return Err(KycGraphError::Validation(format!(
                "entity name '{raw}' is empty after normalization"
            )));
        }
        let len = normalized.chars().count();
        if len < self.config.min_name_len {
            return Err(KycGraphError::Validation(format!(
                "entity name '{raw}' is shorter than {} characters",
                self.config.min_name_len
            )));
        }
        Ok(())
    }
}

fn new_entity(id: EntityId, entity_type: EntityType, mention: &EntityMention) -> Entity {
    let mut entity = Entity {
        id,
        canonical_name: mention.name.trim().to_string(),
        entity_type,
        aliases: Default::default(),
        attributes: Default::default(),
        evidence: Vec::new(),
    };
    merge_into(&mut entity, mention);
    entity
}

fn merge_into(entity: &mut Entity, mention: &EntityMention) {
    let surface_forms = std::iter::once(&mention.name).chain(&mention.aliases);
    for form in surface_forms {
        let form = form.trim();
        if !form.is_empty() {
            entity.aliases.insert(form.to_string());
        }
    }

    for (key, value) in &mention.attributes {
        entity
            .attributes
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    let mut seen: HashSet<&str> = entity.evidence.iter().map(String::as_str).collect();
    let fresh: Vec<String> = mention
        .evidence
        .iter()
        .filter(|e| seen.insert(e.as_str()))
        .cloned()
        .collect();
    entity.evidence.extend(fresh);
}
