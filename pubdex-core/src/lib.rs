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

//! Core domain values, version grammar, and resilience primitives for the
//! pubdex MCP server.

pub mod constraint;
pub mod error;
pub mod model;
pub mod resilience;
pub mod version;

pub use constraint::{sdk_satisfies, ConstraintError, VersionConstraint};
pub use error::RegistryError;
pub use model::{
    AuditLogEntry, CompatibilityRequest, CompatibilityResult, DependencyGraph, DependencyNode,
    InvariantError, PackageDetails, PackageSummary, ScoreInsight, SearchResultSet, VersionDetail,
};
