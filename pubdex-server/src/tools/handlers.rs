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

//! The eight tool executors.
//!
//! Params arrive bound and validated; each executor talks to the registry
//! seam (through the memo cache where applicable) and encodes one domain
//! value as the JSON result.

use super::params::{
    CompatibilityParams, DependencyParams, ListVersionsParams, PackageParams, PublisherParams,
    SearchParams,
};
use super::{compat, deps, ToolContext, ToolError};
use pubdex_core::model::CompatibilityRequest;
use pubdex_registry::MemoCache;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Internal(format!("response encoding: {e}")))
}

pub async fn search_packages(
    ctx: &ToolContext,
    request: SearchParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let query = request.query.as_deref().unwrap_or_default().trim().to_string();
    let result = ctx
        .registry
        .search(
            cancel,
            &query,
            request.include_prerelease,
            request.sdk_constraint.as_deref(),
        )
        .await?;
    encode(&result)
}

pub async fn latest_version(
    ctx: &ToolContext,
    request: PackageParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let package = request.package.as_deref().unwrap_or_default();
    let latest = ctx.registry.latest_version(cancel, package).await?;
    encode(&latest)
}

pub async fn list_versions(
    ctx: &ToolContext,
    request: ListVersionsParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let package = request.package.as_deref().unwrap_or_default();
    let history = ctx.registry.version_history(cancel, package).await?;
    let versions: Vec<_> = history.into_iter().take(request.effective_take()).collect();
    Ok(json!({
        "package": package,
        "versions": encode(&versions)?,
    }))
}

pub async fn package_details(
    ctx: &ToolContext,
    request: PackageParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let package = request.package.as_deref().unwrap_or_default();
    let details = ctx.registry.package_details(cancel, package).await?;
    encode(&details)
}

pub async fn publisher_packages(
    ctx: &ToolContext,
    request: PublisherParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let publisher = request.publisher.as_deref().unwrap_or_default();
    let results = ctx.registry.publisher_packages(cancel, publisher).await?;
    encode(&results)
}

pub async fn score_insights(
    ctx: &ToolContext,
    request: PackageParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let package = request.package.as_deref().unwrap_or_default().to_string();
    let key = MemoCache::score_key(&package);
    let registry = Arc::clone(&ctx.registry);
    let cancel = cancel.clone();
    let insight = ctx
        .cache
        .score_with(key, move || async move {
            registry.score(&cancel, &package).await
        })
        .await?;
    encode(&insight)
}

pub async fn check_compatibility(
    ctx: &ToolContext,
    request: CompatibilityParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    // Validation already vetted these; construction re-checks the same
    // rules, so a failure here is a programming error.
    let domain_request = CompatibilityRequest::new(
        request.package.as_deref().unwrap_or_default(),
        request.flutter_sdk.as_deref().unwrap_or_default(),
        request.project_constraint.clone(),
    )
    .map_err(|e| ToolError::Internal(e.to_string()))?;

    let history = ctx
        .registry
        .version_history(cancel, domain_request.package())
        .await?;
    let result = compat::solve(&domain_request, &history)
        .map_err(|e| ToolError::Internal(e.to_string()))?;
    encode(&result)
}

pub async fn dependency_inspector(
    ctx: &ToolContext,
    request: DependencyParams,
    cancel: &CancellationToken,
) -> Result<Value, ToolError> {
    let package = request.package.as_deref().unwrap_or_default();
    let requested = request.version.as_deref().unwrap_or_default().to_string();
    let include_dev = request.include_dev_dependencies;

    // Resolve the root first so the cache key names a concrete version.
    let manifest = ctx
        .registry
        .inspect_dependencies(cancel, package, &requested, include_dev)
        .await?;

    let key = MemoCache::graph_key(&manifest.package, &manifest.resolved, include_dev);
    let registry = Arc::clone(&ctx.registry);
    let cancel = cancel.clone();
    let graph = ctx
        .cache
        .graph_with(key, move || async move {
            deps::build_graph(registry.as_ref(), &cancel, &manifest, &requested).await
        })
        .await?;
    encode(&graph)
}
