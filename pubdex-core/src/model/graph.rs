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

//! Dependency-graph values.

use super::InvariantError;
use crate::version::parse_version;
use serde::{Deserialize, Serialize};

/// One resolved dependency in the graph.
///
/// Invariant: a `(package, resolved)` pair never reappears among its own
/// transitive children, so no root-to-leaf path repeats a node. Each
/// constructor checks its own pair against the (already validated)
/// subtree below it, which gives the path property inductively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DependencyNodeRaw")]
pub struct DependencyNode {
    package: String,
    requested: String,
    resolved: String,
    is_direct: bool,
    children: Vec<DependencyNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyNodeRaw {
    package: String,
    requested: String,
    resolved: String,
    is_direct: bool,
    #[serde(default)]
    children: Vec<DependencyNode>,
}

impl TryFrom<DependencyNodeRaw> for DependencyNode {
    type Error = InvariantError;

    fn try_from(raw: DependencyNodeRaw) -> Result<Self, Self::Error> {
        DependencyNode::new(raw.package, raw.requested, raw.resolved, raw.is_direct, raw.children)
    }
}

impl DependencyNode {
    pub fn new(
        package: impl Into<String>,
        requested: impl Into<String>,
        resolved: impl Into<String>,
        is_direct: bool,
        children: Vec<DependencyNode>,
    ) -> Result<Self, InvariantError> {
        let package = package.into();
        if package.trim().is_empty() {
            return Err(InvariantError::new("DependencyNode", "package", "must not be empty"));
        }
        let resolved = resolved.into();
        parse_version(&resolved)
            .map_err(|e| InvariantError::new("DependencyNode", "resolved", e.to_string()))?;

        let node = Self {
            package,
            requested: requested.into(),
            resolved,
            is_direct,
            children,
        };
        if node.subtree_contains(&node.package, &node.resolved) {
            return Err(InvariantError::new(
                "DependencyNode",
                "children",
                format!("{}@{} reappears in its own subtree", node.package, node.resolved),
            ));
        }
        Ok(node)
    }

    fn subtree_contains(&self, package: &str, resolved: &str) -> bool {
        self.children.iter().any(|child| {
            (child.package == package && child.resolved == resolved)
                || child.subtree_contains(package, resolved)
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn resolved(&self) -> &str {
        &self.resolved
    }

    pub fn is_direct(&self) -> bool {
        self.is_direct
    }

    pub fn children(&self) -> &[DependencyNode] {
        &self.children
    }
}

/// A single-rooted dependency graph plus the issues met while building it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DependencyGraphRaw")]
pub struct DependencyGraph {
    root_package: String,
    root_version: String,
    nodes: Vec<DependencyNode>,
    issues: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyGraphRaw {
    root_package: String,
    root_version: String,
    nodes: Vec<DependencyNode>,
    #[serde(default)]
    issues: Vec<String>,
}

impl TryFrom<DependencyGraphRaw> for DependencyGraph {
    type Error = InvariantError;

    fn try_from(raw: DependencyGraphRaw) -> Result<Self, Self::Error> {
        DependencyGraph::new(raw.root_package, raw.root_version, raw.nodes, raw.issues)
    }
}

impl DependencyGraph {
    pub fn new(
        root_package: impl Into<String>,
        root_version: impl Into<String>,
        nodes: Vec<DependencyNode>,
        issues: Vec<String>,
    ) -> Result<Self, InvariantError> {
        let root_package = root_package.into();
        if root_package.trim().is_empty() {
            return Err(InvariantError::new("DependencyGraph", "rootPackage", "must not be empty"));
        }
        let root_version = root_version.into();
        parse_version(&root_version)
            .map_err(|e| InvariantError::new("DependencyGraph", "rootVersion", e.to_string()))?;
        if nodes.is_empty() {
            return Err(InvariantError::new(
                "DependencyGraph",
                "nodes",
                "must hold at least the root node",
            ));
        }
        Ok(Self {
            root_package,
            root_version,
            nodes,
            issues,
        })
    }

    pub fn root_package(&self) -> &str {
        &self.root_package
    }

    pub fn root_version(&self) -> &str {
        &self.root_version
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(package: &str, resolved: &str) -> DependencyNode {
        DependencyNode::new(package, "^1.0.0", resolved, false, vec![]).unwrap()
    }

    #[test]
    fn test_node_rejects_path_repeat() {
        let inner = DependencyNode::new("a", "^1.0.0", "1.0.0", false, vec![]).unwrap();
        let middle = DependencyNode::new("b", "^2.0.0", "2.0.0", false, vec![inner]).unwrap();
        let err = DependencyNode::new("a", "any", "1.0.0", true, vec![middle]);
        assert!(err.is_err());
    }

    #[test]
    fn test_same_package_different_version_allowed() {
        let inner = leaf("a", "1.0.0");
        let middle = DependencyNode::new("b", "^2.0.0", "2.0.0", false, vec![inner]).unwrap();
        let root = DependencyNode::new("a", "any", "2.0.0", true, vec![middle]);
        assert!(root.is_ok());
    }

    #[test]
    fn test_graph_requires_root() {
        assert!(DependencyGraph::new("http", "1.2.1", vec![], vec![]).is_err());
        assert!(DependencyGraph::new("http", "1.2.1", vec![leaf("path", "1.9.0")], vec![]).is_ok());
        assert!(DependencyGraph::new("http", "nope", vec![leaf("path", "1.9.0")], vec![]).is_err());
    }

    #[test]
    fn test_round_trip() {
        let child = leaf("path", "1.9.0");
        let root = DependencyNode::new("http", "", "1.2.1", true, vec![child]).unwrap();
        let graph = DependencyGraph::new(
            "http",
            "1.2.1",
            vec![root],
            vec!["Failed to resolve dependency 'web' (^0.5.0): not found".into()],
        )
        .unwrap();
        let text = serde_json::to_string(&graph).unwrap();
        let decoded: DependencyGraph = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, graph);
    }
}
