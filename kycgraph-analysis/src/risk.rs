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

//! Rule-based community risk tiering
//!
//! Rules are evaluated in a fixed order and the first tier with a firing
//! rule decides:
//!
//! | Tier   | Rules                                                        |
//! |--------|--------------------------------------------------------------|
//! | High   | `entity_count >= high_size` or `density >= high_density`     |
//! | Medium | `entity_count >= medium_size` or `density >= medium_density` |
//! | Low    | otherwise                                                    |

use kycgraph_core::{
    Community, KycGraphResult, RiskAssessment, RiskLevel, RiskRule, RiskThresholds,
};

/// Internal edge weight over the number of member pairs.
///
/// Collapsed edges can carry weight above 1, so the ratio is clamped to 1.
pub fn density(community: &Community) -> f64 {
    let n = community.entity_count();
    if n < 2 {
        return 0.0;
    }
    let pairs = (n * (n - 1) / 2) as f64;
    (community.internal_edge_weight as f64 / pairs).min(1.0)
}

#[derive(Debug, Clone)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
}

impl RiskClassifier {
    /// Rejects inconsistent thresholds before anything is classified
    pub fn new(thresholds: RiskThresholds) -> KycGraphResult<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn classify(&self, community: &Community) -> RiskAssessment {
        let entity_count = community.entity_count();
        let density = density(community);
        let (risk_level, rationale) = self.evaluate(entity_count, density);

        RiskAssessment {
            community_id: community.id,
            risk_level,
            entity_count,
            density,
            rationale,
        }
    }

    pub fn classify_all(&self, communities: &[Community]) -> Vec<RiskAssessment> {
        communities.iter().map(|c| self.classify(c)).collect()
    }

    /// Tier and fired rules for raw metrics
    pub fn evaluate(&self, entity_count: usize, density: f64) -> (RiskLevel, Vec<RiskRule>) {
        let t = &self.thresholds;

        let tiers = [
            (
                RiskLevel::High,
                [
                    (RiskRule::HighSize, entity_count >= t.high_size),
                    (RiskRule::HighDensity, density >= t.high_density),
                ],
            ),
            (
                RiskLevel::Medium,
                [
                    (RiskRule::MediumSize, entity_count >= t.medium_size),
                    (RiskRule::MediumDensity, density >= t.medium_density),
                ],
            ),
        ];

        tiers
            .iter()
            .map(|(level, rules)| {
                let fired: Vec<RiskRule> = rules
                    .iter()
                    .filter(|(_, fired)| *fired)
                    .map(|(rule, _)| *rule)
                    .collect();
                (*level, fired)
            })
            .find(|(_, fired)| !fired.is_empty())
            .unwrap_or((RiskLevel::Low, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycgraph_core::{EntityId, KycGraphError};

    fn community(size: usize, internal_edge_weight: u64) -> Community {
        Community {
            id: 7,
            members: (0..size)
                .map(|i| EntityId::from(format!("company:c{i}").as_str()))
                .collect(),
            internal_edge_weight,
            external_edge_weight: 0,
            degree_sum: 2 * internal_edge_weight,
            modularity: 0.0,
        }
    }

    fn classifier() -> RiskClassifier {
        RiskClassifier::new(RiskThresholds::default()).unwrap()
    }

    #[test]
    fn test_density() {
        assert_eq!(density(&community(0, 0)), 0.0);
        assert_eq!(density(&community(1, 0)), 0.0);
        assert_eq!(density(&community(4, 3)), 0.5);
        // Heavier than a complete graph
        assert_eq!(density(&community(3, 10)), 1.0);
    }

    #[test]
    fn test_large_dense_community_fires_both_high_rules() {
        // 60 members, 1593 of 1770 pairs connected
        let assessment = classifier().classify(&community(60, 1593));
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(
            assessment.rationale,
            vec![RiskRule::HighSize, RiskRule::HighDensity]
        );
        assert!((assessment.density - 0.9).abs() < 1e-12);
        assert_eq!(assessment.community_id, 7);
        assert_eq!(assessment.entity_count, 60);
    }

    #[test]
    fn test_medium_rationale_lists_only_medium_rules() {
        // 25 members, sparse
        let assessment = classifier().classify(&community(25, 30));
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.rationale, vec![RiskRule::MediumSize]);

        // 4 members, density 0.5
        let assessment = classifier().classify(&community(4, 3));
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.rationale, vec![RiskRule::MediumDensity]);
    }

    #[test]
    fn test_low_has_empty_rationale() {
        let assessment = classifier().classify(&community(5, 1));
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.rationale.is_empty());
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let assessment = classifier().classify(&community(50, 0));
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.rationale, vec![RiskRule::HighSize]);

        let assessment = classifier().classify(&community(20, 0));
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_invalid_thresholds_rejected_at_construction() {
        let thresholds = RiskThresholds {
            medium_density: 0.9,
            ..RiskThresholds::default()
        };
        let err = RiskClassifier::new(thresholds).unwrap_err();
        assert!(matches!(err, KycGraphError::Configuration(_)));
    }
}
