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

//! Resilient pub.dev client.
//!
//! Every upstream call flows breaker → retry → per-attempt timeout. The
//! breaker is keyed on the upstream host; breaker state, the reqwest
//! client, and the pipeline settings are shared across all requests.

use crate::api::{PackageManifest, RegistryApi};
use crate::config::RegistryConfig;
use crate::wire::{requirements, PackageDoc, PublisherDoc, ScoreDoc, SearchPage, VersionDoc};
use async_trait::async_trait;
use chrono::Utc;
use pubdex_core::constraint::{sdk_satisfies, VersionConstraint};
use pubdex_core::model::{PackageDetails, PackageSummary, ScoreInsight, SearchResultSet, VersionDetail};
use pubdex_core::resilience::{BreakerConfig, CircuitBreaker, ResiliencePipeline};
use pubdex_core::version::{cmp_precedence, parse_version};
use pubdex_core::RegistryError;
use dashmap::DashMap;
use reqwest::StatusCode;
use semver::Version;
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Wording of the truncated-search hint.
const MORE_RESULTS_HINT: &str = "More packages available…";

/// Hard cap on search results regardless of configuration.
const SEARCH_RESULT_CAP: usize = 10;

pub struct PubDevClient {
    http: reqwest::Client,
    base: Url,
    search_limit: usize,
    pipeline: ResiliencePipeline,
    breaker_config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl PubDevClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let base = Url::parse(&config.api.base_address).map_err(|e| {
            RegistryError::InvalidInput(format!(
                "invalid upstream base address '{}': {e}",
                config.api.base_address
            ))
        })?;
        let http = reqwest::Client::builder()
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| RegistryError::InvalidInput(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base,
            search_limit: config.api.search_result_limit.min(SEARCH_RESULT_CAP),
            pipeline: config.pipeline(),
            breaker_config: config.breaker(),
            breakers: DashMap::new(),
        })
    }

    fn breaker_for(&self, host: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.breaker_config.clone())))
            .clone()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RegistryError::InvalidInput("upstream base URL cannot be a base".into()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        url: Url,
    ) -> Result<T, RegistryError> {
        let host = url.host_str().unwrap_or("unknown").to_string();
        let breaker = self.breaker_for(&host);
        self.pipeline
            .execute(&breaker, cancel, || self.attempt::<T>(url.clone()))
            .await
    }

    async fn attempt<T: DeserializeOwned>(&self, url: Url) -> Result<T, RegistryError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RegistryError::UpstreamUnavailable(format!("{}: {e}", url.host_str().unwrap_or("?"))))?;
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                tracing::warn!(path = url.path(), error = %e, "upstream payload failed to decode");
                RegistryError::DecodeFailed(format!("{}: {e}", url.path()))
            });
        }
        Err(classify_status(status, &url))
    }

    async fn package_doc(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<PackageDoc, RegistryError> {
        let url = self.endpoint(&["api", "packages", package])?;
        self.fetch_json(cancel, url).await
    }

    async fn score_doc(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<ScoreDoc, RegistryError> {
        let url = self.endpoint(&["api", "packages", package, "score"])?;
        self.fetch_json(cancel, url).await
    }

    async fn publisher_doc(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<PublisherDoc, RegistryError> {
        let url = self.endpoint(&["api", "packages", package, "publisher"])?;
        self.fetch_json(cancel, url).await
    }

    async fn search_page(
        &self,
        cancel: &CancellationToken,
        query: &str,
    ) -> Result<SearchPage, RegistryError> {
        let mut url = self.endpoint(&["api", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        self.fetch_json(cancel, url).await
    }

    /// Assemble a summary: package doc plus a concurrent score/publisher
    /// fan-out.
    async fn summary(
        &self,
        cancel: &CancellationToken,
        package: &str,
        include_prerelease: bool,
    ) -> Result<PackageSummary, RegistryError> {
        let doc = self.package_doc(cancel, package).await?;
        let (score, publisher) =
            tokio::join!(self.score_doc(cancel, package), self.publisher_doc(cancel, package));
        let score = score?;
        let publisher = publisher?;

        let history = decode_history(&doc)?;
        let latest_stable = match history.iter().find(|v| !v.is_prerelease()) {
            Some(stable) => Some(stable.clone()),
            None if include_prerelease => history.first().cloned(),
            None => None,
        };

        let description = doc
            .versions
            .iter()
            .find(|v| latest_stable.as_ref().is_some_and(|ls| ls.version() == v.version))
            .or(doc.latest.as_ref())
            .or_else(|| doc.versions.first())
            .and_then(|v| v.pubspec.description.clone())
            .unwrap_or_default();

        PackageSummary::new(
            doc.name,
            description,
            publisher.publisher_id.unwrap_or_default(),
            score.like_count.unwrap_or(0),
            score.granted_points.unwrap_or(0),
            rescale_popularity(score.popularity_score),
            latest_stable,
        )
        .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }

    /// Shared search/publisher-listing assembly: dedupe candidate names in
    /// first-appearance order, cap, fan out summaries, and decide the
    /// more-results hint.
    async fn assemble_results(
        &self,
        cancel: &CancellationToken,
        query: &str,
        page: &SearchPage,
        include_prerelease: bool,
    ) -> Result<SearchResultSet, RegistryError> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for hit in &page.packages {
            if seen.insert(hit.package.clone()) {
                names.push(hit.package.clone());
            }
        }
        let kept: Vec<_> = names.iter().take(self.search_limit).cloned().collect();
        if kept.is_empty() {
            return Err(RegistryError::NotFound(format!("no packages matched '{query}'")));
        }

        let more = page.next.is_some()
            || names.len() > kept.len()
            || page.total.is_some_and(|total| total as usize > kept.len());

        let fetches = kept
            .iter()
            .map(|name| self.summary(cancel, name, include_prerelease));
        let summaries = futures::future::join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        SearchResultSet::new(
            query,
            summaries,
            more.then(|| MORE_RESULTS_HINT.to_string()),
        )
        .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }
}

#[async_trait]
impl RegistryApi for PubDevClient {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        include_prerelease: bool,
        sdk_constraint: Option<&str>,
    ) -> Result<SearchResultSet, RegistryError> {
        let page = self.search_page(cancel, query).await?;
        let results = self
            .assemble_results(cancel, query, &page, include_prerelease)
            .await?;

        let Some(expr) = sdk_constraint else {
            return Ok(results);
        };
        let probe = probe_version(expr);
        let hint = results.more_results_hint().map(str::to_string);
        let filtered: Vec<_> = results
            .packages()
            .iter()
            .filter(|pkg| {
                pkg.latest_stable()
                    .is_some_and(|ls| sdk_satisfies(ls.sdk_constraint(), &probe))
            })
            .cloned()
            .collect();
        if filtered.is_empty() {
            return Err(RegistryError::NotFound(format!(
                "no packages matching '{query}' support SDK {expr}"
            )));
        }
        SearchResultSet::new(query, filtered, hint)
            .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }

    async fn latest_version(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<VersionDetail, RegistryError> {
        let history = self.version_history(cancel, package).await?;
        Ok(history
            .iter()
            .find(|v| !v.is_prerelease())
            .unwrap_or(&history[0])
            .clone())
    }

    async fn version_history(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<Vec<VersionDetail>, RegistryError> {
        let doc = self.package_doc(cancel, package).await?;
        decode_history(&doc)
    }

    async fn package_details(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<PackageDetails, RegistryError> {
        let doc = self.package_doc(cancel, package).await?;
        let publisher = self.publisher_doc(cancel, package).await?;
        let history = decode_history(&doc)?;
        let latest_stable = history
            .iter()
            .find(|v| !v.is_prerelease())
            .unwrap_or(&history[0])
            .clone();

        let pubspec = doc
            .versions
            .iter()
            .find(|v| v.version == latest_stable.version())
            .or_else(|| doc.versions.first())
            .map(|v| &v.pubspec);

        let description = pubspec
            .and_then(|p| p.description.clone())
            .unwrap_or_default();
        let topics = pubspec
            .and_then(|p| p.topics.clone())
            .unwrap_or_default();

        PackageDetails::new(
            doc.name,
            description,
            publisher.publisher_id.unwrap_or_default(),
            pubspec.and_then(|p| absolute_or_none(p.homepage.as_deref())),
            pubspec.and_then(|p| absolute_or_none(p.repository.as_deref())),
            pubspec.and_then(|p| absolute_or_none(p.issue_tracker.as_deref())),
            latest_stable,
            topics,
        )
        .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }

    async fn publisher_packages(
        &self,
        cancel: &CancellationToken,
        publisher: &str,
    ) -> Result<SearchResultSet, RegistryError> {
        let query = format!("publisher:{publisher}");
        let page = self.search_page(cancel, &query).await?;
        self.assemble_results(cancel, &query, &page, false)
            .await
            .map_err(|err| match err {
                RegistryError::NotFound(_) => {
                    RegistryError::NotFound(format!("publisher '{publisher}' has no packages"))
                }
                other => other,
            })
    }

    async fn score(
        &self,
        cancel: &CancellationToken,
        package: &str,
    ) -> Result<ScoreInsight, RegistryError> {
        let doc = self.score_doc(cancel, package).await?;
        let granted = doc.granted_points.unwrap_or(0);
        let max_points = doc.max_points.unwrap_or(140);
        let likes = doc.like_count.unwrap_or(0);
        let popularity = rescale_popularity(doc.popularity_score);

        let notes = BTreeMap::from([
            (
                "pub points".to_string(),
                format!("{granted} of {max_points} points granted by static analysis"),
            ),
            (
                "popularity".to_string(),
                format!("more popular than {:.0}% of packages", popularity * 100.0),
            ),
            ("likes".to_string(), format!("liked by {likes} developers")),
        ]);

        ScoreInsight::new(package, granted, popularity, likes, granted, notes, Utc::now())
            .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }

    async fn inspect_dependencies(
        &self,
        cancel: &CancellationToken,
        package: &str,
        version: &str,
        include_dev: bool,
    ) -> Result<PackageManifest, RegistryError> {
        let doc = self.package_doc(cancel, package).await?;
        let chosen = resolve_version_doc(&doc, version)?;
        Ok(PackageManifest {
            package: doc.name.clone(),
            resolved: chosen.version.clone(),
            dependencies: requirements(chosen.pubspec.dependencies.as_ref()),
            dev_dependencies: if include_dev {
                requirements(chosen.pubspec.dev_dependencies.as_ref())
            } else {
                Vec::new()
            },
        })
    }

    async fn probe(&self, cancel: &CancellationToken) -> Result<(), RegistryError> {
        let mut url = self.endpoint(&["api", "search"])?;
        url.query_pairs_mut().append_pair("q", "http");
        tokio::select! {
            _ = cancel.cancelled() => Err(RegistryError::Cancelled),
            timed = tokio::time::timeout(self.pipeline.attempt_timeout, self.attempt::<SearchPage>(url)) => {
                match timed {
                    Ok(outcome) => outcome.map(|_| ()),
                    Err(_) => Err(RegistryError::UpstreamUnavailable("readiness probe timed out".into())),
                }
            }
        }
    }
}

fn classify_status(status: StatusCode, url: &Url) -> RegistryError {
    let line = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );
    if status == StatusCode::NOT_FOUND {
        RegistryError::NotFound(url.path().to_string())
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        RegistryError::RateLimited(line)
    } else if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        RegistryError::UpstreamUnavailable(line)
    } else {
        RegistryError::InvalidInput(format!("upstream rejected request: {line}"))
    }
}

fn rescale_popularity(upstream: Option<f64>) -> f64 {
    (upstream.unwrap_or(0.0) / 100.0).clamp(0.0, 1.0)
}

fn absolute_or_none(raw: Option<&str>) -> Option<String> {
    raw.filter(|value| Url::parse(value).is_ok()).map(str::to_string)
}

/// The probe a caller-supplied SDK expression implies: the version itself
/// when exact, else the range's lower bound, else 0.0.0.
fn probe_version(expr: &str) -> Version {
    if let Ok(exact) = parse_version(expr) {
        return exact;
    }
    VersionConstraint::parse(expr)
        .ok()
        .and_then(|c| c.lower_bound())
        .unwrap_or_else(|| Version::new(0, 0, 0))
}

/// Decode and order a package's version list: newest release first,
/// descending lexicographic version string as the tiebreaker.
fn decode_history(doc: &PackageDoc) -> Result<Vec<VersionDetail>, RegistryError> {
    if doc.versions.is_empty() {
        return Err(RegistryError::DecodeFailed(format!(
            "package '{}' document carries no versions",
            doc.name
        )));
    }
    let mut history = doc
        .versions
        .iter()
        .map(VersionDoc::to_detail)
        .collect::<Result<Vec<_>, _>>()?;
    history.sort_by(|a, b| {
        b.released()
            .cmp(&a.released())
            .then_with(|| b.version().cmp(a.version()))
    });
    Ok(history)
}

/// Pick the version document a version-or-constraint refers to.
fn resolve_version_doc<'doc>(
    doc: &'doc PackageDoc,
    requested: &str,
) -> Result<&'doc VersionDoc, RegistryError> {
    if doc.versions.is_empty() {
        return Err(RegistryError::DecodeFailed(format!(
            "package '{}' document carries no versions",
            doc.name
        )));
    }

    let requested = requested.trim();

    // Newest-first ordering mirrors decode_history.
    let mut ordered: Vec<&VersionDoc> = doc.versions.iter().collect();
    ordered.sort_by(|a, b| {
        b.published
            .cmp(&a.published)
            .then_with(|| b.version.cmp(&a.version))
    });

    let latest_stable_or_any = || {
        ordered
            .iter()
            .find(|v| parse_version(&v.version).map(|p| p.pre.is_empty()).unwrap_or(false))
            .copied()
            .unwrap_or(ordered[0])
    };

    if requested.is_empty() {
        return Ok(latest_stable_or_any());
    }

    if let Ok(exact) = parse_version(requested) {
        return ordered
            .iter()
            .find(|v| {
                parse_version(&v.version)
                    .map(|p| cmp_precedence(&p, &exact) == Ordering::Equal)
                    .unwrap_or(false)
            })
            .copied()
            .ok_or_else(|| {
                RegistryError::NotFound(format!("{}@{requested}", doc.name))
            });
    }

    match VersionConstraint::parse(requested) {
        Ok(constraint) if !constraint.is_any() => {
            let mut candidates: Vec<(&VersionDoc, Version)> = ordered
                .iter()
                .filter_map(|v| parse_version(&v.version).ok().map(|p| (*v, p)))
                .filter(|(_, parsed)| constraint.matches(parsed))
                .collect();
            candidates.sort_by(|(_, a), (_, b)| cmp_precedence(b, a));
            candidates
                .first()
                .map(|(v, _)| *v)
                .ok_or_else(|| {
                    RegistryError::NotFound(format!(
                        "no version of '{}' satisfies {requested}",
                        doc.name
                    ))
                })
        }
        // `any` or unparseable: latest stable, falling back to latest overall.
        _ => Ok(latest_stable_or_any()),
    }
}
