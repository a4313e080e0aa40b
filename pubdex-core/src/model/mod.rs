// Copyright 2025 Pubdex (https://github.com/pubdex)
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

//! Immutable domain values.
//!
//! Every entity is constructed through a validating factory; fields are
//! private so invariants cannot be bypassed with a struct literal.
//! Deserialization funnels through the same factories via raw shadow
//! structs, so decoded values are as trustworthy as constructed ones.

mod audit;
mod compat;
mod graph;
mod package;
mod score;

pub use audit::AuditLogEntry;
pub use compat::{CompatibilityRequest, CompatibilityResult};
pub use graph::{DependencyGraph, DependencyNode};
pub use package::{PackageDetails, PackageSummary, SearchResultSet, VersionDetail};
pub use score::ScoreInsight;

use thiserror::Error;

/// A constructor-time invariant violation.
#[derive(Debug, Clone, Error)]
#[error("{entity}.{field}: {reason}")]
pub struct InvariantError {
    entity: &'static str,
    field: &'static str,
    reason: String,
}

impl InvariantError {
    pub(crate) fn new(entity: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            entity,
            field,
            reason: reason.into(),
        }
    }

    /// The entity that rejected construction.
    pub fn entity(&self) -> &str {
        self.entity
    }

    /// The offending field.
    pub fn field(&self) -> &str {
        self.field
    }
}

/// Require an absolute URL (when present).
pub(crate) fn check_absolute_url(
    entity: &'static str,
    field: &'static str,
    value: &Option<String>,
) -> Result<(), InvariantError> {
    if let Some(raw) = value {
        url::Url::parse(raw)
            .map_err(|e| InvariantError::new(entity, field, format!("not an absolute URL: {e}")))?;
    }
    Ok(())
}
