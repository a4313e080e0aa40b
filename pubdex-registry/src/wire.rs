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

//! Upstream wire formats.
//!
//! Unknown fields are ignored throughout. Fields the domain cannot live
//! without (package name, version string, release time) are required here,
//! so their absence surfaces as a decode failure rather than a default.

use chrono::{DateTime, Utc};
use pubdex_core::model::VersionDetail;
use pubdex_core::RegistryError;
use serde::Deserialize;
use serde_json::Value;

/// `GET /api/search?q=…` page.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub packages: Vec<SearchHit>,
    /// Continuation marker; presence means more candidates exist.
    #[serde(default)]
    pub next: Option<String>,
    /// Total candidate count, when the upstream reports one.
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    pub package: String,
}

/// `GET /api/packages/<name>` document.
#[derive(Debug, Deserialize)]
pub struct PackageDoc {
    pub name: String,
    #[serde(default)]
    pub latest: Option<VersionDoc>,
    #[serde(default)]
    pub versions: Vec<VersionDoc>,
}

/// One entry of a package document's version list.
#[derive(Debug, Deserialize)]
pub struct VersionDoc {
    pub version: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub pubspec: Pubspec,
}

/// The slice of a pubspec the server reads.
#[derive(Debug, Default, Deserialize)]
pub struct Pubspec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub issue_tracker: Option<String>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub environment: Option<Environment>,
    /// Declared order is preserved (serde_json `preserve_order`).
    #[serde(default)]
    pub dependencies: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub dev_dependencies: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub sdk: Option<String>,
    #[serde(default)]
    pub flutter: Option<String>,
}

/// `GET /api/packages/<name>/score` document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDoc {
    #[serde(default)]
    pub granted_points: Option<u64>,
    #[serde(default)]
    pub max_points: Option<u64>,
    #[serde(default)]
    pub like_count: Option<u64>,
    /// Reported on a 0..100 scale.
    #[serde(default)]
    pub popularity_score: Option<f64>,
}

/// `GET /api/packages/<name>/publisher` document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherDoc {
    #[serde(default)]
    pub publisher_id: Option<String>,
}

impl Pubspec {
    /// The SDK constraint the compatibility probe is checked against:
    /// the Flutter constraint when one is declared, otherwise the Dart
    /// SDK constraint, otherwise `any`.
    pub fn sdk_constraint(&self) -> String {
        self.environment
            .as_ref()
            .and_then(|env| env.flutter.clone().or_else(|| env.sdk.clone()))
            .unwrap_or_else(|| "any".to_string())
    }

    /// Release-notes URL: the declared changelog when absolute, else the
    /// issue tracker when absolute, else none.
    pub fn release_notes_url(&self) -> Option<String> {
        for candidate in [&self.changelog, &self.issue_tracker] {
            if let Some(raw) = candidate {
                if url::Url::parse(raw).is_ok() {
                    return Some(raw.clone());
                }
            }
        }
        None
    }
}

impl VersionDoc {
    /// Lift the wire version into the domain.
    pub fn to_detail(&self) -> Result<VersionDetail, RegistryError> {
        VersionDetail::new(
            self.version.clone(),
            self.published,
            self.pubspec.sdk_constraint(),
            self.pubspec.release_notes_url(),
        )
        .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }
}

/// Flatten a declared-dependency map into `(name, constraint)` pairs,
/// keeping declaration order. Non-string specs (git, path, sdk tables)
/// carry no version bound and become `any`.
pub fn requirements(map: Option<&serde_json::Map<String, Value>>) -> Vec<(String, String)> {
    let Some(map) = map else {
        return Vec::new();
    };
    map.iter()
        .map(|(name, spec)| {
            let constraint = match spec {
                Value::String(text) => text.clone(),
                _ => "any".to_string(),
            };
            (name.clone(), constraint)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_doc_ignores_unknown_fields() {
        let doc: PackageDoc = serde_json::from_value(serde_json::json!({
            "name": "http",
            "isDiscontinued": false,
            "versions": [{
                "version": "1.2.1",
                "published": "2024-06-01T12:00:00Z",
                "archive_url": "https://pub.dev/archives/http-1.2.1.tar.gz",
                "pubspec": {
                    "description": "A composable HTTP client.",
                    "environment": {"sdk": ">=3.0.0 <4.0.0"},
                    "funding": ["https://example.com"]
                }
            }]
        }))
        .unwrap();
        assert_eq!(doc.name, "http");
        assert_eq!(doc.versions.len(), 1);
    }

    #[test]
    fn test_missing_required_fields_fail() {
        // No version string.
        let missing_version = serde_json::from_value::<VersionDoc>(serde_json::json!({
            "published": "2024-06-01T12:00:00Z"
        }));
        assert!(missing_version.is_err());

        // No release time.
        let missing_published = serde_json::from_value::<VersionDoc>(serde_json::json!({
            "version": "1.2.1"
        }));
        assert!(missing_published.is_err());

        // No package name.
        let missing_name = serde_json::from_value::<PackageDoc>(serde_json::json!({
            "versions": []
        }));
        assert!(missing_name.is_err());
    }

    #[test]
    fn test_sdk_constraint_prefers_flutter() {
        let pubspec: Pubspec = serde_json::from_value(serde_json::json!({
            "environment": {"sdk": ">=3.0.0 <4.0.0", "flutter": ">=3.13.0"}
        }))
        .unwrap();
        assert_eq!(pubspec.sdk_constraint(), ">=3.13.0");

        let dart_only: Pubspec = serde_json::from_value(serde_json::json!({
            "environment": {"sdk": ">=3.0.0 <4.0.0"}
        }))
        .unwrap();
        assert_eq!(dart_only.sdk_constraint(), ">=3.0.0 <4.0.0");

        let bare = Pubspec::default();
        assert_eq!(bare.sdk_constraint(), "any");
    }

    #[test]
    fn test_release_notes_fallback_chain() {
        let with_changelog: Pubspec = serde_json::from_value(serde_json::json!({
            "changelog": "https://example.com/CHANGELOG.md",
            "issue_tracker": "https://example.com/issues"
        }))
        .unwrap();
        assert_eq!(
            with_changelog.release_notes_url().as_deref(),
            Some("https://example.com/CHANGELOG.md")
        );

        let tracker_only: Pubspec = serde_json::from_value(serde_json::json!({
            "changelog": "CHANGELOG.md",
            "issue_tracker": "https://example.com/issues"
        }))
        .unwrap();
        assert_eq!(
            tracker_only.release_notes_url().as_deref(),
            Some("https://example.com/issues")
        );

        assert_eq!(Pubspec::default().release_notes_url(), None);
    }

    #[test]
    fn test_requirements_keep_declared_order() {
        let pubspec: Pubspec = serde_json::from_value(serde_json::json!({
            "dependencies": {
                "zeta": "^1.0.0",
                "alpha": ">=2.0.0 <3.0.0",
                "flutter": {"sdk": "flutter"}
            }
        }))
        .unwrap();
        let reqs = requirements(pubspec.dependencies.as_ref());
        assert_eq!(
            reqs,
            vec![
                ("zeta".to_string(), "^1.0.0".to_string()),
                ("alpha".to_string(), ">=2.0.0 <3.0.0".to_string()),
                ("flutter".to_string(), "any".to_string()),
            ]
        );
    }
}
