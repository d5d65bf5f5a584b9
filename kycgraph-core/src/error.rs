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

//! Kycgraph error types
//!
//! Two families share one enum:
//! - per-record errors (`Validation`, `Referential`) are recoverable; the
//!   pipeline drops the record and keeps a [`crate::Diagnostics`] entry
//! - run-level errors (`Configuration`, `InvariantViolation`, ...) abort the
//!   run before any result is returned

use thiserror::Error;

/// Result type for kycgraph operations
pub type KycGraphResult<T> = Result<T, KycGraphError>;

/// Errors that can occur while building and analysing an entity graph
#[derive(Debug, Error)]
pub enum KycGraphError {
    /// Malformed entity or relationship mention (empty name, zero weight)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Relationship endpoint that does not resolve to a known entity
    #[error("Referential error: {0}")]
    Referential(String),

    /// Risk thresholds or other settings that cannot produce a sound run
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal consistency check failed; indicates a bug, not bad input
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KycGraphError {
    /// Whether the error only invalidates a single record.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KycGraphError::Validation(_) | KycGraphError::Referential(_)
        )
    }
}

impl From<serde_json::Error> for KycGraphError {
    fn from(e: serde_json::Error) -> Self {
        KycGraphError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for KycGraphError {
    fn from(e: toml::de::Error) -> Self {
        KycGraphError::Configuration(e.to_string())
    }
}
