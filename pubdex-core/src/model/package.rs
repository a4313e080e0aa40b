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

//! Package-shaped values: versions, summaries, details, search results.

use super::{check_absolute_url, InvariantError};
use crate::version::{is_prerelease, parse_version};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Maximum packages a search result may carry.
pub(crate) const MAX_SEARCH_RESULTS: usize = 10;

/// One published version of a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "VersionDetailRaw")]
pub struct VersionDetail {
    version: String,
    released: DateTime<Utc>,
    sdk_constraint: String,
    is_prerelease: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_notes_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionDetailRaw {
    version: String,
    released: DateTime<Utc>,
    #[serde(default)]
    sdk_constraint: Option<String>,
    #[serde(default)]
    release_notes_url: Option<String>,
}

impl TryFrom<VersionDetailRaw> for VersionDetail {
    type Error = InvariantError;

    fn try_from(raw: VersionDetailRaw) -> Result<Self, Self::Error> {
        VersionDetail::new(
            raw.version,
            raw.released,
            raw.sdk_constraint.unwrap_or_default(),
            raw.release_notes_url,
        )
    }
}

impl VersionDetail {
    /// Build a version entry. `sdk_constraint` may be empty, which is
    /// normalized to `any`. `release_notes_url` must be absolute when set.
    pub fn new(
        version: impl Into<String>,
        released: DateTime<Utc>,
        sdk_constraint: impl Into<String>,
        release_notes_url: Option<String>,
    ) -> Result<Self, InvariantError> {
        let version = version.into();
        let parsed = parse_version(&version)
            .map_err(|e| InvariantError::new("VersionDetail", "version", e.to_string()))?;

        // The constraint stays an opaque expression here; an expression
        // that fails to parse later simply satisfies no probe.
        let mut sdk_constraint = sdk_constraint.into();
        if sdk_constraint.trim().is_empty() {
            sdk_constraint = "any".to_string();
        }

        check_absolute_url("VersionDetail", "releaseNotesUrl", &release_notes_url)?;

        Ok(Self {
            version,
            released,
            sdk_constraint,
            is_prerelease: is_prerelease(&parsed),
            release_notes_url,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The version string parsed into its SemVer form.
    pub fn parsed_version(&self) -> Version {
        // Validated at construction.
        parse_version(&self.version).expect("version validated on construction")
    }

    pub fn released(&self) -> DateTime<Utc> {
        self.released
    }

    pub fn sdk_constraint(&self) -> &str {
        &self.sdk_constraint
    }

    pub fn is_prerelease(&self) -> bool {
        self.is_prerelease
    }

    pub fn release_notes_url(&self) -> Option<&str> {
        self.release_notes_url.as_deref()
    }
}

/// A package as it appears in a search listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PackageSummaryRaw")]
pub struct PackageSummary {
    name: String,
    description: String,
    publisher: String,
    likes: u64,
    pub_points: u64,
    popularity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_stable: Option<VersionDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageSummaryRaw {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    pub_points: u64,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    latest_stable: Option<VersionDetail>,
}

impl TryFrom<PackageSummaryRaw> for PackageSummary {
    type Error = InvariantError;

    fn try_from(raw: PackageSummaryRaw) -> Result<Self, Self::Error> {
        PackageSummary::new(
            raw.name,
            raw.description,
            raw.publisher,
            raw.likes,
            raw.pub_points,
            raw.popularity,
            raw.latest_stable,
        )
    }
}

impl PackageSummary {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        publisher: impl Into<String>,
        likes: u64,
        pub_points: u64,
        popularity: f64,
        latest_stable: Option<VersionDetail>,
    ) -> Result<Self, InvariantError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvariantError::new("PackageSummary", "name", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&popularity) || popularity.is_nan() {
            return Err(InvariantError::new(
                "PackageSummary",
                "popularity",
                format!("{popularity} outside [0, 1]"),
            ));
        }
        Ok(Self {
            name,
            description: description.into(),
            publisher: publisher.into(),
            likes,
            pub_points,
            popularity,
            latest_stable,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn likes(&self) -> u64 {
        self.likes
    }

    pub fn pub_points(&self) -> u64 {
        self.pub_points
    }

    pub fn popularity(&self) -> f64 {
        self.popularity
    }

    pub fn latest_stable(&self) -> Option<&VersionDetail> {
        self.latest_stable.as_ref()
    }
}

/// Full package metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PackageDetailsRaw")]
pub struct PackageDetails {
    package: String,
    description: String,
    publisher: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue_tracker: Option<String>,
    latest_stable: VersionDetail,
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageDetailsRaw {
    package: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    issue_tracker: Option<String>,
    latest_stable: VersionDetail,
    #[serde(default)]
    topics: Vec<String>,
}

impl TryFrom<PackageDetailsRaw> for PackageDetails {
    type Error = InvariantError;

    fn try_from(raw: PackageDetailsRaw) -> Result<Self, Self::Error> {
        PackageDetails::new(
            raw.package,
            raw.description,
            raw.publisher,
            raw.homepage,
            raw.repository,
            raw.issue_tracker,
            raw.latest_stable,
            raw.topics,
        )
    }
}

impl PackageDetails {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        package: impl Into<String>,
        description: impl Into<String>,
        publisher: impl Into<String>,
        homepage: Option<String>,
        repository: Option<String>,
        issue_tracker: Option<String>,
        latest_stable: VersionDetail,
        topics: Vec<String>,
    ) -> Result<Self, InvariantError> {
        let package = package.into();
        if package.trim().is_empty() {
            return Err(InvariantError::new("PackageDetails", "package", "must not be empty"));
        }
        check_absolute_url("PackageDetails", "homepage", &homepage)?;
        check_absolute_url("PackageDetails", "repository", &repository)?;
        check_absolute_url("PackageDetails", "issueTracker", &issue_tracker)?;
        Ok(Self {
            package,
            description: description.into(),
            publisher: publisher.into(),
            homepage,
            repository,
            issue_tracker,
            latest_stable,
            topics,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn issue_tracker(&self) -> Option<&str> {
        self.issue_tracker.as_deref()
    }

    pub fn latest_stable(&self) -> &VersionDetail {
        &self.latest_stable
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

/// An ordered, capped search result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SearchResultSetRaw")]
pub struct SearchResultSet {
    query: String,
    packages: Vec<PackageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    more_results_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultSetRaw {
    query: String,
    packages: Vec<PackageSummary>,
    #[serde(default)]
    more_results_hint: Option<String>,
}

impl TryFrom<SearchResultSetRaw> for SearchResultSet {
    type Error = InvariantError;

    fn try_from(raw: SearchResultSetRaw) -> Result<Self, Self::Error> {
        SearchResultSet::new(raw.query, raw.packages, raw.more_results_hint)
    }
}

impl SearchResultSet {
    /// Build a result set. `packages` must hold 1 to 10 entries in
    /// insertion order.
    pub fn new(
        query: impl Into<String>,
        packages: Vec<PackageSummary>,
        more_results_hint: Option<String>,
    ) -> Result<Self, InvariantError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(InvariantError::new("SearchResultSet", "query", "must not be empty"));
        }
        if packages.is_empty() {
            return Err(InvariantError::new(
                "SearchResultSet",
                "packages",
                "must hold at least one package",
            ));
        }
        if packages.len() > MAX_SEARCH_RESULTS {
            return Err(InvariantError::new(
                "SearchResultSet",
                "packages",
                format!("{} entries exceed the cap of {MAX_SEARCH_RESULTS}", packages.len()),
            ));
        }
        Ok(Self {
            query,
            packages,
            more_results_hint,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn packages(&self) -> &[PackageSummary] {
        &self.packages
    }

    pub fn more_results_hint(&self) -> Option<&str> {
        self.more_results_hint.as_deref()
    }
}
