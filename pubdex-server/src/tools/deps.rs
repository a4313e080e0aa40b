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

//! Dependency-graph builder.
//!
//! Depth-first over declared dependencies with a depth cap, cycle
//! detection on the current `(package, resolved)` path, and per-child
//! failure isolation: one missing branch becomes an issue, never a failed
//! graph. A re-entered node is dropped (issue only) so no root-to-leaf
//! path repeats a pair. Cancellation is not a per-child failure — it
//! aborts the whole build so the caller can surface it as such.

use pubdex_core::model::{DependencyGraph, DependencyNode};
use pubdex_core::RegistryError;
use pubdex_registry::{PackageManifest, RegistryApi};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Maximum traversal depth below the root.
pub const MAX_DEPTH: usize = 10;

/// Build the graph for an already-resolved root manifest.
///
/// `requested` is the caller's original version-or-constraint expression,
/// echoed on the root node. Dev dependencies arrive already gated by the
/// caller (root manifest only).
pub async fn build_graph(
    registry: &dyn RegistryApi,
    cancel: &CancellationToken,
    root: &PackageManifest,
    requested: &str,
) -> Result<DependencyGraph, RegistryError> {
    let mut issues = Vec::new();
    let mut path = HashSet::new();
    path.insert((root.package.clone(), root.resolved.clone()));

    // Declared runtime order first, dev appended after.
    let declared = root.dependencies.iter().chain(root.dev_dependencies.iter());

    let mut children = Vec::new();
    for (name, constraint) in declared {
        if let Some(node) =
            build_child(registry, cancel, name, constraint, 1, &mut path, &mut issues).await?
        {
            children.push(node);
        }
    }

    let root_node = DependencyNode::new(
        root.package.clone(),
        if requested.trim().is_empty() { "any" } else { requested.trim() },
        root.resolved.clone(),
        true,
        children,
    )
    .map_err(|e| RegistryError::DecodeFailed(e.to_string()))?;

    DependencyGraph::new(root.package.clone(), root.resolved.clone(), vec![root_node], issues)
        .map_err(|e| RegistryError::DecodeFailed(e.to_string()))
}

/// Recursive step; boxed because async recursion has no static size.
fn build_child<'a>(
    registry: &'a dyn RegistryApi,
    cancel: &'a CancellationToken,
    name: &'a str,
    constraint: &'a str,
    depth: usize,
    path: &'a mut HashSet<(String, String)>,
    issues: &'a mut Vec<String>,
) -> Pin<Box<dyn Future<Output = Result<Option<DependencyNode>, RegistryError>> + Send + 'a>> {
    Box::pin(async move {
        // Cancellation fails the whole build, not just this branch.
        if cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }

        let manifest = match registry
            .inspect_dependencies(cancel, name, constraint, false)
            .await
        {
            Ok(manifest) => manifest,
            Err(RegistryError::Cancelled) => return Err(RegistryError::Cancelled),
            Err(err) => {
                issues.push(format!(
                    "Failed to resolve dependency '{name}' ({constraint}): {err}"
                ));
                return Ok(None);
            }
        };

        let pair = (manifest.package.clone(), manifest.resolved.clone());
        if path.contains(&pair) {
            issues.push(format!(
                "Detected circular dependency at {}@{}",
                manifest.package, manifest.resolved
            ));
            return Ok(None);
        }

        if depth > MAX_DEPTH {
            issues.push(format!(
                "Dependency depth exceeded limit for {name} ({constraint})"
            ));
            return Ok(childless(name, constraint, &manifest.resolved, depth, issues));
        }

        path.insert(pair.clone());
        let mut children = Vec::new();
        for (child_name, child_constraint) in &manifest.dependencies {
            if let Some(node) = build_child(
                registry,
                cancel,
                child_name,
                child_constraint,
                depth + 1,
                path,
                issues,
            )
            .await?
            {
                children.push(node);
            }
        }
        path.remove(&pair);

        match DependencyNode::new(name, constraint, manifest.resolved, depth == 1, children) {
            Ok(node) => Ok(Some(node)),
            Err(err) => {
                issues.push(format!(
                    "Failed to resolve dependency '{name}' ({constraint}): {err}"
                ));
                Ok(None)
            }
        }
    })
}

fn childless(
    name: &str,
    constraint: &str,
    resolved: &str,
    depth: usize,
    issues: &mut Vec<String>,
) -> Option<DependencyNode> {
    match DependencyNode::new(name, constraint, resolved, depth == 1, Vec::new()) {
        Ok(node) => Some(node),
        Err(err) => {
            issues.push(format!(
                "Failed to resolve dependency '{name}' ({constraint}): {err}"
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pubdex_core::model::{PackageDetails, ScoreInsight, SearchResultSet, VersionDetail};
    use std::collections::HashMap;

    /// In-memory registry fixture: package → (resolved version, deps).
    struct FakeRegistry {
        manifests: HashMap<String, PackageManifest>,
        /// Lookups of this package report cancellation mid-traversal.
        cancel_package: Option<String>,
    }

    impl FakeRegistry {
        fn new(entries: &[(&str, &str, &[(&str, &str)])]) -> Self {
            let manifests = entries
                .iter()
                .map(|(name, version, deps)| {
                    (
                        name.to_string(),
                        PackageManifest {
                            package: name.to_string(),
                            resolved: version.to_string(),
                            dependencies: deps
                                .iter()
                                .map(|(dep, constraint)| (dep.to_string(), constraint.to_string()))
                                .collect(),
                            dev_dependencies: Vec::new(),
                        },
                    )
                })
                .collect();
            Self {
                manifests,
                cancel_package: None,
            }
        }
    }

    #[async_trait]
    impl RegistryApi for FakeRegistry {
        async fn search(
            &self,
            _: &CancellationToken,
            _: &str,
            _: bool,
            _: Option<&str>,
        ) -> Result<SearchResultSet, RegistryError> {
            unimplemented!("not used by the graph builder")
        }

        async fn latest_version(
            &self,
            _: &CancellationToken,
            _: &str,
        ) -> Result<VersionDetail, RegistryError> {
            unimplemented!("not used by the graph builder")
        }

        async fn version_history(
            &self,
            _: &CancellationToken,
            _: &str,
        ) -> Result<Vec<VersionDetail>, RegistryError> {
            unimplemented!("not used by the graph builder")
        }

        async fn package_details(
            &self,
            _: &CancellationToken,
            _: &str,
        ) -> Result<PackageDetails, RegistryError> {
            unimplemented!("not used by the graph builder")
        }

        async fn publisher_packages(
            &self,
            _: &CancellationToken,
            _: &str,
        ) -> Result<SearchResultSet, RegistryError> {
            unimplemented!("not used by the graph builder")
        }

        async fn score(
            &self,
            _: &CancellationToken,
            _: &str,
        ) -> Result<ScoreInsight, RegistryError> {
            unimplemented!("not used by the graph builder")
        }

        async fn inspect_dependencies(
            &self,
            _: &CancellationToken,
            package: &str,
            _version: &str,
            _include_dev: bool,
        ) -> Result<PackageManifest, RegistryError> {
            if self.cancel_package.as_deref() == Some(package) {
                return Err(RegistryError::Cancelled);
            }
            self.manifests
                .get(package)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound(package.to_string()))
        }

        async fn probe(&self, _: &CancellationToken) -> Result<(), RegistryError> {
            Ok(())
        }
    }

    async fn graph_for(registry: &FakeRegistry, root: &str) -> DependencyGraph {
        let cancel = CancellationToken::new();
        let manifest = registry
            .inspect_dependencies(&cancel, root, "", false)
            .await
            .unwrap();
        build_graph(registry, &cancel, &manifest, "").await.unwrap()
    }

    #[tokio::test]
    async fn test_cycle_detected() {
        let registry = FakeRegistry::new(&[
            ("a", "1.0.0", &[("b", "^2.0.0")]),
            ("b", "2.0.0", &[("a", "^1.0.0")]),
        ]);
        let graph = graph_for(&registry, "a").await;

        // One node per package: a at the root, b below it, the back-edge
        // suppressed.
        let root = &graph.nodes()[0];
        assert_eq!(root.package(), "a");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].package(), "b");
        assert!(root.children()[0].children().is_empty());
        assert!(graph
            .issues()
            .iter()
            .any(|issue| issue == "Detected circular dependency at a@1.0.0"));
    }

    #[tokio::test]
    async fn test_cancellation_mid_traversal_fails_the_build() {
        let mut registry = FakeRegistry::new(&[
            ("app", "1.0.0", &[("ok_dep", "any"), ("slow_dep", "any")]),
            ("ok_dep", "1.0.0", &[]),
            ("slow_dep", "2.0.0", &[]),
        ]);
        registry.cancel_package = Some("slow_dep".to_string());

        let cancel = CancellationToken::new();
        let manifest = registry
            .inspect_dependencies(&cancel, "app", "", false)
            .await
            .unwrap();
        let outcome = build_graph(&registry, &cancel, &manifest, "").await;

        // No polluted "successful" graph: cancellation aborts the build.
        assert!(matches!(outcome, Err(RegistryError::Cancelled)));
    }

    #[tokio::test]
    async fn test_token_cancelled_between_children_fails_the_build() {
        let registry = FakeRegistry::new(&[
            ("app", "1.0.0", &[("lib", "any")]),
            ("lib", "1.0.0", &[]),
        ]);
        let cancel = CancellationToken::new();
        let manifest = registry
            .inspect_dependencies(&cancel, "app", "", false)
            .await
            .unwrap();
        cancel.cancel();

        let outcome = build_graph(&registry, &cancel, &manifest, "").await;
        assert!(matches!(outcome, Err(RegistryError::Cancelled)));
    }

    #[tokio::test]
    async fn test_failed_child_becomes_issue() {
        let registry = FakeRegistry::new(&[(
            "app",
            "1.0.0",
            &[("present", "^1.0.0"), ("missing", "^2.0.0"), ("also_present", "any")],
        ), ("present", "1.4.0", &[]), ("also_present", "0.3.0", &[])]);
        let graph = graph_for(&registry, "app").await;

        let root = &graph.nodes()[0];
        let names: Vec<_> = root.children().iter().map(|c| c.package()).collect();
        assert_eq!(names, vec!["present", "also_present"]);
        assert!(graph.issues().iter().any(|issue| issue
            .contains("Failed to resolve dependency 'missing' (^2.0.0)")));
    }

    #[tokio::test]
    async fn test_depth_cap_yields_childless_node() {
        // A chain p0 → p1 → … longer than the cap.
        let chain: Vec<(String, String, Vec<(String, String)>)> = (0..=12)
            .map(|i| {
                let deps = if i < 12 {
                    vec![(format!("p{}", i + 1), "any".to_string())]
                } else {
                    vec![]
                };
                (format!("p{i}"), "1.0.0".to_string(), deps)
            })
            .collect();
        let borrowed: Vec<(&str, &str, Vec<(&str, &str)>)> = chain
            .iter()
            .map(|(name, version, deps)| {
                (
                    name.as_str(),
                    version.as_str(),
                    deps.iter()
                        .map(|(d, c)| (d.as_str(), c.as_str()))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();
        let entries: Vec<(&str, &str, &[(&str, &str)])> = borrowed
            .iter()
            .map(|(name, version, deps)| (*name, *version, deps.as_slice()))
            .collect();
        let registry = FakeRegistry::new(&entries);

        let graph = graph_for(&registry, "p0").await;
        assert!(graph
            .issues()
            .iter()
            .any(|issue| issue.contains("Dependency depth exceeded limit for p11")));

        // Walk to the deepest materialized node: p11, childless.
        let mut node = &graph.nodes()[0];
        let mut depth = 0;
        while let Some(child) = node.children().first() {
            node = child;
            depth += 1;
        }
        assert_eq!(node.package(), "p11");
        assert_eq!(depth, MAX_DEPTH + 1);
        assert!(node.children().is_empty());
    }

    #[tokio::test]
    async fn test_declared_order_preserved() {
        let registry = FakeRegistry::new(&[
            ("app", "1.0.0", &[("zeta", "any"), ("alpha", "any"), ("mid", "any")]),
            ("zeta", "1.0.0", &[]),
            ("alpha", "1.0.0", &[]),
            ("mid", "1.0.0", &[]),
        ]);
        let graph = graph_for(&registry, "app").await;
        let names: Vec<_> = graph.nodes()[0]
            .children()
            .iter()
            .map(|c| c.package())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_direct_flag_only_at_depth_one() {
        let registry = FakeRegistry::new(&[
            ("app", "1.0.0", &[("direct", "any")]),
            ("direct", "1.0.0", &[("transitive", "any")]),
            ("transitive", "1.0.0", &[]),
        ]);
        let graph = graph_for(&registry, "app").await;
        let direct = &graph.nodes()[0].children()[0];
        assert!(direct.is_direct());
        assert!(!direct.children()[0].is_direct());
    }

    #[tokio::test]
    async fn test_diamond_is_not_a_cycle() {
        // a → {b, c}, b → d, c → d: d appears twice but on different paths.
        let registry = FakeRegistry::new(&[
            ("a", "1.0.0", &[("b", "any"), ("c", "any")]),
            ("b", "1.0.0", &[("d", "any")]),
            ("c", "1.0.0", &[("d", "any")]),
            ("d", "1.0.0", &[]),
        ]);
        let graph = graph_for(&registry, "a").await;
        assert!(graph.issues().is_empty());
        let root = &graph.nodes()[0];
        assert_eq!(root.children()[0].children()[0].package(), "d");
        assert_eq!(root.children()[1].children()[0].package(), "d");
    }
}
