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

//! In-process registry fixture shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pubdex_core::model::{
    PackageDetails, ScoreInsight, SearchResultSet, VersionDetail,
};
use pubdex_core::RegistryError;
use pubdex_registry::{PackageManifest, RegistryApi};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct FakeRegistry {
    pub histories: HashMap<String, Vec<VersionDetail>>,
    pub manifests: HashMap<String, PackageManifest>,
    /// When set, every operation fails with a clone of this error.
    pub failure: Option<RegistryError>,
    /// When set, dependency lookups of this package report cancellation,
    /// simulating a client that disconnects mid-traversal.
    pub cancel_on_package: Option<String>,
    pub score_calls: AtomicU32,
    pub probe_outcome: Option<RegistryError>,
}

impl FakeRegistry {
    pub fn with_history(mut self, package: &str, history: Vec<VersionDetail>) -> Self {
        self.histories.insert(package.to_string(), history);
        self
    }

    pub fn with_manifest(mut self, manifest: PackageManifest) -> Self {
        self.manifests.insert(manifest.package.clone(), manifest);
        self
    }

    pub fn failing(mut self, error: RegistryError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn with_cancel_on(mut self, package: &str) -> Self {
        self.cancel_on_package = Some(package.to_string());
        self
    }

    pub fn with_probe_outcome(mut self, error: RegistryError) -> Self {
        self.probe_outcome = Some(error);
        self
    }

    fn check_failure(&self) -> Result<(), RegistryError> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn search(
        &self,
        _cancel: &CancellationToken,
        query: &str,
        _include_prerelease: bool,
        _sdk_constraint: Option<&str>,
    ) -> Result<SearchResultSet, RegistryError> {
        self.check_failure()?;
        Err(RegistryError::NotFound(format!("no packages matched '{query}'")))
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
        _cancel: &CancellationToken,
        package: &str,
    ) -> Result<Vec<VersionDetail>, RegistryError> {
        self.check_failure()?;
        self.histories
            .get(package)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("package '{package}'")))
    }

    async fn package_details(
        &self,
        _cancel: &CancellationToken,
        package: &str,
    ) -> Result<PackageDetails, RegistryError> {
        self.check_failure()?;
        Err(RegistryError::NotFound(format!("package '{package}'")))
    }

    async fn publisher_packages(
        &self,
        _cancel: &CancellationToken,
        publisher: &str,
    ) -> Result<SearchResultSet, RegistryError> {
        self.check_failure()?;
        Err(RegistryError::NotFound(format!("publisher '{publisher}'")))
    }

    async fn score(
        &self,
        _cancel: &CancellationToken,
        package: &str,
    ) -> Result<ScoreInsight, RegistryError> {
        self.check_failure()?;
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        ScoreInsight::new(
            package,
            140,
            0.98,
            4500,
            140,
            BTreeMap::new(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )
        .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
    }

    async fn inspect_dependencies(
        &self,
        _cancel: &CancellationToken,
        package: &str,
        _version: &str,
        include_dev: bool,
    ) -> Result<PackageManifest, RegistryError> {
        self.check_failure()?;
        if self.cancel_on_package.as_deref() == Some(package) {
            return Err(RegistryError::Cancelled);
        }
        let mut manifest = self
            .manifests
            .get(package)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("package '{package}'")))?;
        if !include_dev {
            manifest.dev_dependencies.clear();
        }
        Ok(manifest)
    }

    async fn probe(&self, _cancel: &CancellationToken) -> Result<(), RegistryError> {
        match &self.probe_outcome {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub fn released(days_ago: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap() - Duration::days(days_ago)
}

pub fn detail(version: &str, days_ago: i64, sdk: &str) -> VersionDetail {
    VersionDetail::new(version, released(days_ago), sdk, None).unwrap()
}

pub fn manifest(package: &str, version: &str, deps: &[(&str, &str)]) -> PackageManifest {
    PackageManifest {
        package: package.to_string(),
        resolved: version.to_string(),
        dependencies: deps
            .iter()
            .map(|(name, constraint)| (name.to_string(), constraint.to_string()))
            .collect(),
        dev_dependencies: Vec::new(),
    }
}
