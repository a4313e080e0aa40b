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

//! SDK-compatibility request and result values.

use super::{InvariantError, VersionDetail};
use crate::constraint::VersionConstraint;
use crate::version::parse_version;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Upper bound on versions a compatibility evaluation may report.
pub(crate) const MAX_EVALUATED_VERSIONS: usize = 50;

/// What the assistant asked: does `package` work with `flutter_sdk`?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CompatibilityRequestRaw")]
pub struct CompatibilityRequest {
    package: String,
    flutter_sdk: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_constraint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompatibilityRequestRaw {
    package: String,
    flutter_sdk: String,
    #[serde(default)]
    project_constraint: Option<String>,
}

impl TryFrom<CompatibilityRequestRaw> for CompatibilityRequest {
    type Error = InvariantError;

    fn try_from(raw: CompatibilityRequestRaw) -> Result<Self, Self::Error> {
        CompatibilityRequest::new(raw.package, raw.flutter_sdk, raw.project_constraint)
    }
}

impl CompatibilityRequest {
    /// `flutter_sdk` must be an exact semver or a parsable constraint;
    /// `project_constraint` must parse as a range when present.
    pub fn new(
        package: impl Into<String>,
        flutter_sdk: impl Into<String>,
        project_constraint: Option<String>,
    ) -> Result<Self, InvariantError> {
        let package = package.into();
        if package.trim().is_empty() {
            return Err(InvariantError::new(
                "CompatibilityRequest",
                "package",
                "must not be empty",
            ));
        }

        let flutter_sdk = flutter_sdk.into();
        if parse_version(&flutter_sdk).is_err() {
            VersionConstraint::parse(&flutter_sdk).map_err(|e| {
                InvariantError::new("CompatibilityRequest", "flutterSdk", e.to_string())
            })?;
        }

        if let Some(range) = &project_constraint {
            VersionConstraint::parse(range).map_err(|e| {
                InvariantError::new("CompatibilityRequest", "projectConstraint", e.to_string())
            })?;
        }

        Ok(Self {
            package,
            flutter_sdk,
            project_constraint,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn flutter_sdk(&self) -> &str {
        &self.flutter_sdk
    }

    pub fn project_constraint(&self) -> Option<&str> {
        self.project_constraint.as_deref()
    }

    /// The point estimate of the target SDK: the value itself when exact,
    /// otherwise the constraint's lower bound (0.0.0 when unbounded below).
    pub fn probe_version(&self) -> Version {
        if let Ok(exact) = parse_version(&self.flutter_sdk) {
            return exact;
        }
        VersionConstraint::parse(&self.flutter_sdk)
            .ok()
            .and_then(|c| c.lower_bound())
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }
}

/// The solver's answer for one [`CompatibilityRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CompatibilityResultRaw")]
pub struct CompatibilityResult {
    request: CompatibilityRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommended_version: Option<VersionDetail>,
    satisfies: bool,
    explanation: String,
    evaluated_versions: Vec<VersionDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompatibilityResultRaw {
    request: CompatibilityRequest,
    #[serde(default)]
    recommended_version: Option<VersionDetail>,
    satisfies: bool,
    explanation: String,
    evaluated_versions: Vec<VersionDetail>,
}

impl TryFrom<CompatibilityResultRaw> for CompatibilityResult {
    type Error = InvariantError;

    fn try_from(raw: CompatibilityResultRaw) -> Result<Self, Self::Error> {
        CompatibilityResult::new(
            raw.request,
            raw.recommended_version,
            raw.satisfies,
            raw.explanation,
            raw.evaluated_versions,
        )
    }
}

impl CompatibilityResult {
    /// Invariants: `satisfies` requires a recommendation, the explanation
    /// is never empty, and 1 to 50 versions were evaluated.
    pub fn new(
        request: CompatibilityRequest,
        recommended_version: Option<VersionDetail>,
        satisfies: bool,
        explanation: impl Into<String>,
        evaluated_versions: Vec<VersionDetail>,
    ) -> Result<Self, InvariantError> {
        if satisfies && recommended_version.is_none() {
            return Err(InvariantError::new(
                "CompatibilityResult",
                "recommendedVersion",
                "required when satisfies is true",
            ));
        }
        let explanation = explanation.into();
        if explanation.trim().is_empty() {
            return Err(InvariantError::new(
                "CompatibilityResult",
                "explanation",
                "must not be empty",
            ));
        }
        if evaluated_versions.is_empty() || evaluated_versions.len() > MAX_EVALUATED_VERSIONS {
            return Err(InvariantError::new(
                "CompatibilityResult",
                "evaluatedVersions",
                format!(
                    "{} entries outside 1..={MAX_EVALUATED_VERSIONS}",
                    evaluated_versions.len()
                ),
            ));
        }
        Ok(Self {
            request,
            recommended_version,
            satisfies,
            explanation,
            evaluated_versions,
        })
    }

    pub fn request(&self) -> &CompatibilityRequest {
        &self.request
    }

    pub fn recommended_version(&self) -> Option<&VersionDetail> {
        self.recommended_version.as_ref()
    }

    pub fn satisfies(&self) -> bool {
        self.satisfies
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn evaluated_versions(&self) -> &[VersionDetail] {
        &self.evaluated_versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn detail(version: &str) -> VersionDetail {
        let released = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        VersionDetail::new(version, released, "any", None).unwrap()
    }

    #[test]
    fn test_request_accepts_exact_and_range() {
        assert!(CompatibilityRequest::new("http", "3.24.0", None).is_ok());
        assert!(CompatibilityRequest::new("http", "^3.22.0", None).is_ok());
        assert!(CompatibilityRequest::new("http", ">=3.13.0 <4.0.0", None).is_ok());
        assert!(CompatibilityRequest::new("http", "three-ish", None).is_err());
        assert!(
            CompatibilityRequest::new("http", "3.24.0", Some(">=oops".into())).is_err()
        );
    }

    #[test]
    fn test_probe_version() {
        let exact = CompatibilityRequest::new("http", "3.24.0", None).unwrap();
        assert_eq!(exact.probe_version(), semver::Version::new(3, 24, 0));

        let range = CompatibilityRequest::new("http", ">=3.13.0 <4.0.0", None).unwrap();
        assert_eq!(range.probe_version(), semver::Version::new(3, 13, 0));

        let unbounded = CompatibilityRequest::new("http", "<4.0.0", None).unwrap();
        assert_eq!(unbounded.probe_version(), semver::Version::new(0, 0, 0));
    }

    #[test]
    fn test_satisfies_requires_recommendation() {
        let request = CompatibilityRequest::new("http", "3.24.0", None).unwrap();
        let err = CompatibilityResult::new(
            request.clone(),
            None,
            true,
            "compatible",
            vec![detail("1.2.1")],
        );
        assert!(err.is_err());

        let ok = CompatibilityResult::new(
            request,
            Some(detail("1.2.1")),
            true,
            "compatible with Flutter 3.24.0",
            vec![detail("1.2.1")],
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_evaluated_versions_bounds() {
        let request = CompatibilityRequest::new("http", "3.24.0", None).unwrap();
        assert!(CompatibilityResult::new(request.clone(), None, false, "none fit", vec![]).is_err());

        let too_many: Vec<_> = (0..51).map(|i| detail(&format!("1.0.{i}"))).collect();
        assert!(CompatibilityResult::new(request, None, false, "none fit", too_many).is_err());
    }
}
