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

//! Tool registry and descriptors.
//!
//! All eight tools are declared once in a static table: name, description,
//! input schema, and a runner that binds the typed params, validates them,
//! and invokes the handler. No dynamic discovery.

pub mod compat;
pub mod deps;
pub mod handlers;
pub mod params;

use crate::rpc::protocol::{FieldError, JsonRpcError};
use pubdex_core::RegistryError;
use pubdex_registry::{MemoCache, RegistryApi};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every tool execution.
pub struct ToolContext {
    pub registry: Arc<dyn RegistryApi>,
    pub cache: Arc<MemoCache>,
}

/// Failures a tool execution can produce.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid params")]
    InvalidParams(Vec<FieldError>),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Map onto the canonical JSON-RPC error set.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            ToolError::InvalidParams(errors) => JsonRpcError::invalid_params(errors.clone()),
            ToolError::Registry(RegistryError::Cancelled) => JsonRpcError::cancelled(),
            ToolError::Registry(err @ RegistryError::UpstreamUnavailable(_))
            | ToolError::Registry(err @ RegistryError::RateLimited(_)) => {
                JsonRpcError::upstream_unavailable(err.to_string())
            }
            ToolError::Registry(err) => JsonRpcError::internal_error(err.to_string()),
            ToolError::Internal(message) => JsonRpcError::internal_error(message.clone()),
        }
    }

    /// Span status label (`rpc.status_code`).
    pub fn status_label(&self) -> &'static str {
        match self {
            ToolError::InvalidParams(_) => "INVALID_ARGUMENT",
            ToolError::Registry(RegistryError::Cancelled) => "CANCELLED",
            ToolError::Registry(RegistryError::UpstreamUnavailable(_))
            | ToolError::Registry(RegistryError::RateLimited(_)) => "ERROR",
            _ => "EXCEPTION",
        }
    }
}

/// Boxed tool execution future.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;

type Runner = for<'a> fn(&'a ToolContext, Value, &'a CancellationToken) -> ToolFuture<'a>;

/// One entry of the tool table.
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    input_schema: fn() -> Value,
    runner: Runner,
}

impl ToolDescriptor {
    pub fn run<'a>(
        &self,
        ctx: &'a ToolContext,
        params: Value,
        cancel: &'a CancellationToken,
    ) -> ToolFuture<'a> {
        (self.runner)(ctx, params, cancel)
    }

    pub fn input_schema(&self) -> Value {
        (self.input_schema)()
    }
}

/// Name → descriptor table, built once at startup.
pub struct ToolRegistry {
    entries: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let entries = descriptors();
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, descriptor)| (descriptor.name, position))
            .collect();
        Self { entries, index }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.entries.iter()
    }

    /// The `tools/list` result.
    pub fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .iter()
            .map(|descriptor| {
                json!({
                    "name": descriptor.name,
                    "description": descriptor.description,
                    "inputSchema": descriptor.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "search_packages",
            description: "Search pub.dev for packages by keyword. Returns at most 10 \
                          results in relevance order, with a hint when more exist.",
            input_schema: search_schema,
            runner: run_search_packages,
        },
        ToolDescriptor {
            name: "latest_version",
            description: "Latest stable version of a package (prereleases are skipped \
                          unless nothing stable exists). The release-notes URL comes \
                          from the declared changelog, falling back to the issue tracker.",
            input_schema: package_schema,
            runner: run_latest_version,
        },
        ToolDescriptor {
            name: "check_compatibility",
            description: "Evaluate whether a package supports a Flutter SDK version or \
                          range, recommending the newest compatible release.",
            input_schema: compatibility_schema,
            runner: run_check_compatibility,
        },
        ToolDescriptor {
            name: "list_versions",
            description: "Version history of a package, newest release first. The \
                          release-notes URL comes from the declared changelog, falling \
                          back to the issue tracker.",
            input_schema: list_versions_schema,
            runner: run_list_versions,
        },
        ToolDescriptor {
            name: "package_details",
            description: "Full metadata for a package: publisher, links, topics, and \
                          its latest stable version.",
            input_schema: package_schema,
            runner: run_package_details,
        },
        ToolDescriptor {
            name: "publisher_packages",
            description: "Packages owned by a publisher, assembled like search results.",
            input_schema: publisher_schema,
            runner: run_publisher_packages,
        },
        ToolDescriptor {
            name: "score_insights",
            description: "Aggregated quality signals for a package: pub points, \
                          popularity, and likes. Cached for ten minutes.",
            input_schema: package_schema,
            runner: run_score_insights,
        },
        ToolDescriptor {
            name: "dependency_inspector",
            description: "Resolve a package's dependency graph (depth-capped, \
                          cycle-safe). Dev dependencies are included at the root only \
                          when requested. Cached for ten minutes.",
            input_schema: dependency_schema,
            runner: run_dependency_inspector,
        },
    ]
}

fn run_search_packages<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::SearchParams = params::bind(params)?;
        request.validate()?;
        handlers::search_packages(ctx, request, cancel).await
    })
}

fn run_latest_version<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::PackageParams = params::bind(params)?;
        request.validate()?;
        handlers::latest_version(ctx, request, cancel).await
    })
}

fn run_check_compatibility<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::CompatibilityParams = params::bind(params)?;
        request.validate()?;
        handlers::check_compatibility(ctx, request, cancel).await
    })
}

fn run_list_versions<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::ListVersionsParams = params::bind(params)?;
        request.validate()?;
        handlers::list_versions(ctx, request, cancel).await
    })
}

fn run_package_details<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::PackageParams = params::bind(params)?;
        request.validate()?;
        handlers::package_details(ctx, request, cancel).await
    })
}

fn run_publisher_packages<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::PublisherParams = params::bind(params)?;
        request.validate()?;
        handlers::publisher_packages(ctx, request, cancel).await
    })
}

fn run_score_insights<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::PackageParams = params::bind(params)?;
        request.validate()?;
        handlers::score_insights(ctx, request, cancel).await
    })
}

fn run_dependency_inspector<'a>(
    ctx: &'a ToolContext,
    params: Value,
    cancel: &'a CancellationToken,
) -> ToolFuture<'a> {
    Box::pin(async move {
        let request: params::DependencyParams = params::bind(params)?;
        request.validate()?;
        handlers::dependency_inspector(ctx, request, cancel).await
    })
}

fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search terms (trimmed, at most 80 characters)"
            },
            "includePrerelease": {
                "type": "boolean",
                "description": "Allow prerelease versions as the listed latest version",
                "default": false
            },
            "sdkConstraint": {
                "type": "string",
                "description": "Keep only packages whose latest stable supports this SDK version or range"
            }
        },
        "required": ["query"]
    })
}

fn package_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "package": {
                "type": "string",
                "description": "Package name (lowercase letters, digits, underscores)"
            }
        },
        "required": ["package"]
    })
}

fn list_versions_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "package": {
                "type": "string",
                "description": "Package name (lowercase letters, digits, underscores)"
            },
            "take": {
                "type": "integer",
                "description": "Versions to return, clamped to [1, 200]",
                "default": 50
            }
        },
        "required": ["package"]
    })
}

fn compatibility_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "package": {
                "type": "string",
                "description": "Package name (lowercase letters, digits, underscores)"
            },
            "flutterSdk": {
                "type": "string",
                "description": "Target Flutter SDK: an exact version (3.24.0) or a range (>=3.13.0 <4.0.0); a range is probed at its lower bound"
            },
            "projectConstraint": {
                "type": "string",
                "description": "Optional range the project already pins the package to; applied as a hard filter"
            }
        },
        "required": ["package", "flutterSdk"]
    })
}

fn publisher_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "publisher": {
                "type": "string",
                "description": "Publisher id, e.g. dart.dev"
            }
        },
        "required": ["publisher"]
    })
}

fn dependency_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "package": {
                "type": "string",
                "description": "Package name (lowercase letters, digits, underscores)"
            },
            "version": {
                "type": "string",
                "description": "Exact version or constraint; empty means latest stable"
            },
            "includeDevDependencies": {
                "type": "boolean",
                "description": "Append root-level dev dependencies after runtime dependencies",
                "default": false
            }
        },
        "required": ["package"]
    })
}
