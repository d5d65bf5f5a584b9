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

//! Entity, Relationship and Community Types
//!
//! Defines the core types shared by every stage of the pipeline: the raw
//! mentions handed over by the extraction collaborator, the deduplicated
//! entities, communities and their risk assessments.

use crate::error::KycGraphResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a deduplicated entity.
///
/// Derived from the entity type and its normalized name, e.g.
/// `company:acme_holdings`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Build the id for a normalized name of the given type
    pub fn derive(entity_type: EntityType, normalized_name: &str) -> Self {
        Self(format!(
            "{}:{}",
            entity_type.tag(),
            normalized_name.replace(' ', "_")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Entity types in the knowledge graph
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A legal person: company, bank, trust, regulator
    Company,
    /// A natural person, in any role
    Person,
    /// A country, city, address or jurisdiction
    Location,
    /// An account, transaction, security or amount
    FinancialInstrument,
    /// Unknown type; compatible with any declared type during merges
    #[default]
    Other,
}

impl EntityType {
    /// Short lowercase tag used in entity ids
    pub fn tag(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::Person => "person",
            EntityType::Location => "location",
            EntityType::FinancialInstrument => "financial_instrument",
            EntityType::Other => "other",
        }
    }

    /// Everything except `Other`
    pub fn is_specific(&self) -> bool {
        !matches!(self, EntityType::Other)
    }

    /// Two declared types may refer to the same entity
    pub fn is_compatible(&self, other: &EntityType) -> bool {
        self == other || !self.is_specific() || !other.is_specific()
    }
}

impl FromStr for EntityType {
    type Err = Infallible;

    /// Map a free-form extractor label onto the closed set. Unknown labels
    /// become `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_uppercase().replace([' ', '-'], "_");
        Ok(match label.as_str() {
            "COMPANY" | "CORPORATION" | "CORP" | "LLC" | "LTD" | "PARTNERSHIP" | "TRUST"
            | "FOUNDATION" | "SUBSIDIARY" | "HOLDING_COMPANY" | "JOINT_VENTURE" | "BRANCH"
            | "REPRESENTATIVE_OFFICE" | "BANK" | "FINANCIAL_INSTITUTION" | "PAYMENT_PROCESSOR"
            | "EXCHANGE" | "ORGANIZATION" | "ORGANISATION" | "ORG" | "REGULATOR" | "AUTHORITY"
            | "COURT" | "CLIENT" | "CUSTOMER" | "SUPPLIER" | "VENDOR" | "PARTNER" => {
                EntityType::Company
            }
            "PERSON" | "INDIVIDUAL" | "DIRECTOR" | "CEO" | "CFO" | "SHAREHOLDER"
            | "BENEFICIAL_OWNER" | "UBO" | "EMPLOYEE" | "CONSULTANT" | "AGENT"
            | "REPRESENTATIVE" | "SIGNATORY" => EntityType::Person,
            "LOCATION" | "COUNTRY" | "STATE" | "CITY" | "ADDRESS" | "JURISDICTION"
            | "TAX_HAVEN" | "REGION" => EntityType::Location,
            "FINANCIAL_INSTRUMENT" | "INSTRUMENT" | "ACCOUNT" | "TRANSACTION" | "CURRENCY"
            | "AMOUNT" | "BOND" | "SHARE" | "SHARES" | "STOCK" | "SECURITY" | "LOAN" | "FUND"
            | "DERIVATIVE" => EntityType::FinancialInstrument,
            _ => EntityType::Other,
        })
    }
}

impl<'de> Deserialize<'de> for EntityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(label.parse().unwrap_or(EntityType::Other))
    }
}

/// Relationship types between entities
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// A owns, controls or holds shares in B
    Ownership,
    /// Commercial or employment tie
    Business,
    /// Litigation, licensing, regulation, sanctions
    Legal,
    /// Payments, loans, investments, banking
    Financial,
    /// Anything else
    #[default]
    Other,
}

impl RelationType {
    const OWNERSHIP_STEMS: &'static [&'static str] = &[
        "own", "subsidiar", "parent", "sharehold", "stake", "holding", "beneficial", "control",
        "acquir",
    ];
    const LEGAL_STEMS: &'static [&'static str] = &[
        "legal", "sue", "court", "regulat", "licens", "sanction", "litigat", "lawsuit",
        "complian", "investigat", "fined", "penal",
    ];
    const FINANCIAL_STEMS: &'static [&'static str] = &[
        "financ", "pay", "transfer", "loan", "lend", "invest", "fund", "bank", "account",
        "transaction", "deposit", "credit", "debt",
    ];
    const BUSINESS_STEMS: &'static [&'static str] = &[
        "business", "partner", "suppl", "client", "customer", "contract", "work", "employ",
        "director", "ceo", "cfo", "officer", "agent", "vendor", "serv", "distribut",
        "represent",
    ];
}

impl FromStr for RelationType {
    type Err = Infallible;

    /// Classify a free-form extractor predicate such as `subsidiary_of` or
    /// `banks with`. Tokens are matched by stem so `known_as` does not count
    /// as ownership.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let any_stem = |stems: &[&str]| {
            tokens
                .iter()
                .any(|token| stems.iter().any(|stem| token.starts_with(stem)))
        };

        Ok(if any_stem(Self::OWNERSHIP_STEMS) {
            RelationType::Ownership
        } else if any_stem(Self::LEGAL_STEMS) {
            RelationType::Legal
        } else if any_stem(Self::FINANCIAL_STEMS) {
            RelationType::Financial
        } else if any_stem(Self::BUSINESS_STEMS) {
            RelationType::Business
        } else {
            RelationType::Other
        })
    }
}

impl<'de> Deserialize<'de> for RelationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(label.parse().unwrap_or(RelationType::Other))
    }
}

fn default_weight() -> u64 {
    1
}

/// Decode a field, falling back to its default when the value has the wrong
/// shape. Downstream validation then drops the record with its real index.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// `null` counts as absent; anything but a non-negative integer becomes 0
fn lenient_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => default_weight(),
        value => value.as_u64().unwrap_or(0),
    })
}

/// Decode every record on its own. A record that is not an object at all
/// becomes an empty mention, which fails validation like any other.
fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .collect())
}

/// A raw entity mention from the extraction collaborator.
///
/// Every field decodes leniently: a missing or mistyped `name` becomes empty
/// and the normalizer drops the mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Surface form as it appeared in the document
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    /// Declared type; free-form labels are mapped onto [`EntityType`]
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub entity_type: EntityType,
    #[serde(default, deserialize_with = "lenient")]
    pub attributes: BTreeMap<String, String>,
    /// Source-text references (document, page, chunk id)
    #[serde(default, deserialize_with = "lenient")]
    pub evidence: Vec<String>,
    /// Additional surface forms already known to denote this entity
    #[serde(default, deserialize_with = "lenient")]
    pub aliases: Vec<String>,
}

impl EntityMention {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            attributes: BTreeMap::new(),
            evidence: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }
}

impl From<&Entity> for EntityMention {
    /// Feed an already normalized entity back through the normalizer
    fn from(entity: &Entity) -> Self {
        Self {
            name: entity.canonical_name.clone(),
            entity_type: entity.entity_type,
            attributes: entity.attributes.clone(),
            evidence: entity.evidence.clone(),
            aliases: entity.aliases.iter().cloned().collect(),
        }
    }
}

/// A raw relationship mention from the extraction collaborator.
///
/// Decodes leniently like [`EntityMention`]: empty endpoints and zero
/// weights are dropped by the graph builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMention {
    /// Raw name (or entity id) of the source endpoint
    #[serde(default, deserialize_with = "lenient")]
    pub source: String,
    /// Raw name (or entity id) of the target endpoint
    #[serde(default, deserialize_with = "lenient")]
    pub target: String,
    #[serde(default, deserialize_with = "lenient")]
    pub relation: RelationType,
    /// Observation weight, summed when the same pair recurs
    #[serde(default = "default_weight", deserialize_with = "lenient_weight")]
    pub weight: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub evidence: Vec<String>,
    /// Disambiguates same-name entities of different types
    #[serde(default, deserialize_with = "lenient")]
    pub source_type: Option<EntityType>,
    #[serde(default, deserialize_with = "lenient")]
    pub target_type: Option<EntityType>,
}

impl RelationshipMention {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: RelationType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            weight: 1,
            evidence: Vec::new(),
            source_type: None,
            target_type: None,
        }
    }

    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_types(mut self, source_type: EntityType, target_type: EntityType) -> Self {
        self.source_type = Some(source_type);
        self.target_type = Some(target_type);
        self
    }
}

impl Default for RelationshipMention {
    fn default() -> Self {
        Self::new("", "", RelationType::Other)
    }
}

/// Everything the extraction collaborator produced for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default, deserialize_with = "records")]
    pub entities: Vec<EntityMention>,
    #[serde(default, deserialize_with = "records")]
    pub relationships: Vec<RelationshipMention>,
}

impl ExtractionBatch {
    pub fn new(entities: Vec<EntityMention>, relationships: Vec<RelationshipMention>) -> Self {
        Self {
            entities,
            relationships,
        }
    }

    /// Parse a batch from the extractor's JSON output.
    ///
    /// Malformed records are kept in place so that later stages drop and
    /// count them by index. Only broken JSON or a non-array `entities` /
    /// `relationships` value fails the whole batch.
    pub fn from_json_str(json: &str) -> KycGraphResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Concatenate independently extracted batches, preserving batch order.
    ///
    /// Normalization only starts once every batch has been merged.
    pub fn merge(batches: impl IntoIterator<Item = ExtractionBatch>) -> Self {
        let mut merged = ExtractionBatch::default();
        for batch in batches {
            merged.entities.extend(batch.entities);
            merged.relationships.extend(batch.relationships);
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// A deduplicated knowledge graph entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,
    /// First-seen surface form
    pub canonical_name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Every surface form that resolved to this entity (never empty)
    pub aliases: BTreeSet<String>,
    /// Free-form metadata; first-seen value wins on key collision
    pub attributes: BTreeMap<String, String>,
    /// Source-text references in first-seen order
    pub evidence: Vec<String>,
}

/// A community/cluster of related entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Community ID, assigned at detection time
    pub id: u32,
    /// Entity IDs in node insertion order
    pub members: Vec<EntityId>,
    /// Sum of edge weights with both endpoints inside
    pub internal_edge_weight: u64,
    /// Sum of edge weights with exactly one endpoint inside
    pub external_edge_weight: u64,
    /// Total weighted degree of the members
    pub degree_sum: u64,
    /// This community's contribution to the partition's modularity
    pub modularity: f64,
}

impl Community {
    pub fn entity_count(&self) -> usize {
        self.members.len()
    }
}

/// Qualitative risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Threshold rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRule {
    HighSize,
    HighDensity,
    MediumSize,
    MediumDensity,
}

impl RiskRule {
    pub fn name(&self) -> &'static str {
        match self {
            RiskRule::HighSize => "high_size",
            RiskRule::HighDensity => "high_density",
            RiskRule::MediumSize => "medium_size",
            RiskRule::MediumDensity => "medium_density",
        }
    }
}

/// Risk classification of one community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub community_id: u32,
    pub risk_level: RiskLevel,
    pub entity_count: usize,
    /// Internal edge weight over the number of member pairs, in [0, 1]
    pub density: f64,
    /// Rules that decided the tier
    pub rationale: Vec<RiskRule>,
}
