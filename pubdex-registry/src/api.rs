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

//! The registry-client seam.
//!
//! Handlers depend on this trait rather than on the HTTP client, so the
//! solver and graph builder can be exercised against in-process fakes.

use async_trait::async_trait;
use pubdex_core::model::{PackageDetails, ScoreInsight, SearchResultSet, VersionDetail};
use pubdex_core::RegistryError;
use tokio_util::sync::CancellationToken;

/// A package version's declared dependencies, resolved to one concrete
/// version of the package itself.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    pub package: String,
    /// The concrete version the requested version-or-constraint resolved to.
    pub resolved: String,
    /// Runtime dependencies in declared order.
    pub dependencies: Vec<(String, String)>,
    /// Dev dependencies in declared order.
    pub dev_dependencies: Vec<(String, String)>,
}

/// Typed operations over the upstream registry.
///
/// Callers own input shape: package and publisher names are expected to
/// already match the tool-boundary validation rules.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Search for packages; at most the configured limit, in relevance
    /// order. `sdk_constraint` (an exact version or a range) filters the
    /// assembled summaries to those whose latest stable admits the probe.
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        include_prerelease: bool,
        sdk_constraint: Option<&str>,
    ) -> Result<SearchResultSet, RegistryError>;

    /// The newest stable version, falling back to the newest overall when
    /// the package has never published a stable release.
    async fn latest_version(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<VersionDetail, RegistryError>;

    /// All published versions, newest release first (ties broken by
    /// descending lexicographic version string).
    async fn version_history(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<Vec<VersionDetail>, RegistryError>;

    /// Full metadata for one package.
    async fn package_details(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<PackageDetails, RegistryError>;

    /// Packages owned by a publisher, assembled like search results.
    async fn publisher_packages(
        &self,
        cancel: &CancellationToken,
        publisher: &str,
    ) -> Result<SearchResultSet, RegistryError>;

    /// Aggregated score signals for one package.
    async fn score(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<ScoreInsight, RegistryError>;

    /// Resolve `version` (empty = latest stable, exact, or a constraint)
    /// and return that version's declared dependencies.
    async fn inspect_dependencies(
        &self,
        cancel: &CancellationToken,
        package: &str,
        version: &str,
        include_dev: bool,
    ) -> Result<PackageManifest, RegistryError>;

    /// One unretried call against the search endpoint, for readiness
    /// probing.
    async fn probe(&self, cancel: &CancellationToken) -> Result<(), RegistryError>;
}
