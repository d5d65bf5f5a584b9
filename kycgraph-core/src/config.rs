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

//! Pipeline configuration
//!
//! Every setting has a default, can be loaded from a TOML file and can be
//! overridden from the environment. [`PipelineConfig::validate`] must pass
//! before any data is processed; a risk model with inverted or out-of-range
//! thresholds is rejected outright.
//!
//! ```toml
//! [risk]
//! high_size = 50
//! high_density = 0.6
//! medium_size = 20
//! medium_density = 0.3
//!
//! [detection]
//! method = "greedy_modularity"
//! ```

use crate::error::{KycGraphError, KycGraphResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default community size at which a community is High risk
pub const DEFAULT_HIGH_SIZE_THRESHOLD: usize = 50;

/// Default density at which a community is High risk
pub const DEFAULT_HIGH_DENSITY_THRESHOLD: f64 = 0.6;

/// Default community size at which a community is Medium risk
pub const DEFAULT_MEDIUM_SIZE_THRESHOLD: usize = 20;

/// Default density at which a community is Medium risk
pub const DEFAULT_MEDIUM_DENSITY_THRESHOLD: f64 = 0.3;

pub const ENV_HIGH_SIZE: &str = "KYCGRAPH_HIGH_SIZE_THRESHOLD";
pub const ENV_HIGH_DENSITY: &str = "KYCGRAPH_HIGH_DENSITY_THRESHOLD";
pub const ENV_MEDIUM_SIZE: &str = "KYCGRAPH_MEDIUM_SIZE_THRESHOLD";
pub const ENV_MEDIUM_DENSITY: &str = "KYCGRAPH_MEDIUM_DENSITY_THRESHOLD";
pub const ENV_DETECTION_METHOD: &str = "KYCGRAPH_DETECTION_METHOD";
pub const ENV_TOP_K: &str = "KYCGRAPH_TOP_K";

/// Risk tier thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Communities with at least this many entities are High
    #[serde(default = "default_high_size")]
    pub high_size: usize,

    /// Communities at least this dense are High
    #[serde(default = "default_high_density")]
    pub high_density: f64,

    /// Communities with at least this many entities are Medium
    #[serde(default = "default_medium_size")]
    pub medium_size: usize,

    /// Communities at least this dense are Medium
    #[serde(default = "default_medium_density")]
    pub medium_density: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_size: DEFAULT_HIGH_SIZE_THRESHOLD,
            high_density: DEFAULT_HIGH_DENSITY_THRESHOLD,
            medium_size: DEFAULT_MEDIUM_SIZE_THRESHOLD,
            medium_density: DEFAULT_MEDIUM_DENSITY_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    /// Build validated thresholds
    pub fn new(
        high_size: usize,
        high_density: f64,
        medium_size: usize,
        medium_density: f64,
    ) -> KycGraphResult<Self> {
        let thresholds = Self {
            high_size,
            high_density,
            medium_size,
            medium_density,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Reject thresholds that would make the tiers overlap or never fire
    /// predictably.
    pub fn validate(&self) -> KycGraphResult<()> {
        for (name, value) in [
            ("high_density", self.high_density),
            ("medium_density", self.medium_density),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(KycGraphError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.medium_size >= self.high_size {
            return Err(KycGraphError::Configuration(format!(
                "medium_size ({}) must be below high_size ({})",
                self.medium_size, self.high_size
            )));
        }

        if self.medium_density >= self.high_density {
            return Err(KycGraphError::Configuration(format!(
                "medium_density ({}) must be below high_density ({})",
                self.medium_density, self.high_density
            )));
        }

        Ok(())
    }
}

/// Entity normalizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Normalized names shorter than this (in characters) are dropped
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_name_len: default_min_name_len(),
        }
    }
}

/// Community detection algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Clauset–Newman–Moore greedy modularity maximization
    #[default]
    GreedyModularity,
    /// One community per connected component
    ConnectedComponents,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::GreedyModularity => "greedy_modularity",
            DetectionMethod::ConnectedComponents => "connected_components",
        }
    }

    fn parse(value: &str) -> KycGraphResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "greedy_modularity" | "greedy" | "cnm" => Ok(DetectionMethod::GreedyModularity),
            "connected_components" | "components" => Ok(DetectionMethod::ConnectedComponents),
            other => Err(KycGraphError::Configuration(format!(
                "unknown detection method '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub method: DetectionMethod,
}

/// Statistics aggregator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Number of entities reported by weighted degree
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Heaviest internal edges listed per community
    #[serde(default = "default_sample_edges")]
    pub sample_edges: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            sample_edges: default_sample_edges(),
        }
    }
}

/// Kycgraph pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub risk: RiskThresholds,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

// Default values
fn default_high_size() -> usize {
    DEFAULT_HIGH_SIZE_THRESHOLD
}

fn default_high_density() -> f64 {
    DEFAULT_HIGH_DENSITY_THRESHOLD
}

fn default_medium_size() -> usize {
    DEFAULT_MEDIUM_SIZE_THRESHOLD
}

fn default_medium_density() -> f64 {
    DEFAULT_MEDIUM_DENSITY_THRESHOLD
}

fn default_min_name_len() -> usize {
    1
}

fn default_top_k() -> usize {
    10
}

fn default_sample_edges() -> usize {
    5
}

impl PipelineConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> KycGraphResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading pipeline config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> KycGraphResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden from environment variables
    ///
    /// Supported environment variables:
    /// - KYCGRAPH_HIGH_SIZE_THRESHOLD (default: 50)
    /// - KYCGRAPH_HIGH_DENSITY_THRESHOLD (default: 0.6)
    /// - KYCGRAPH_MEDIUM_SIZE_THRESHOLD (default: 20)
    /// - KYCGRAPH_MEDIUM_DENSITY_THRESHOLD (default: 0.3)
    /// - KYCGRAPH_DETECTION_METHOD (greedy_modularity | connected_components)
    /// - KYCGRAPH_TOP_K (default: 10)
    pub fn from_env() -> KycGraphResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup, then validate.
    ///
    /// Unparseable values are configuration errors, never silently ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> KycGraphResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_HIGH_SIZE) {
            self.risk.high_size = parse_env(ENV_HIGH_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_HIGH_DENSITY) {
            self.risk.high_density = parse_env(ENV_HIGH_DENSITY, &value)?;
        }
        if let Some(value) = lookup(ENV_MEDIUM_SIZE) {
            self.risk.medium_size = parse_env(ENV_MEDIUM_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_MEDIUM_DENSITY) {
            self.risk.medium_density = parse_env(ENV_MEDIUM_DENSITY, &value)?;
        }
        if let Some(value) = lookup(ENV_DETECTION_METHOD) {
            self.detection.method = DetectionMethod::parse(&value)?;
        }
        if let Some(value) = lookup(ENV_TOP_K) {
            self.stats.top_k = parse_env(ENV_TOP_K, &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> KycGraphResult<()> {
        self.risk.validate()?;

        if self.normalizer.min_name_len == 0 {
            return Err(KycGraphError::Configuration(
                "normalizer.min_name_len must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> KycGraphResult<T> {
    value.trim().parse().map_err(|_| {
        KycGraphError::Configuration(format!("{key} has an invalid value '{value}'"))
    })
}
