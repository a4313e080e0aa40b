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

//! Memoization of score and dependency-graph computations.
//!
//! Concurrent misses for one key coalesce into a single factory run
//! (single-flight); the other waiters park on the in-flight result. A
//! failed or cancelled factory stores nothing, and its error is surfaced
//! to every waiter.

use moka::future::Cache;
use pubdex_core::model::{DependencyGraph, ScoreInsight};
use pubdex_core::RegistryError;
use std::future::Future;
use std::time::Duration;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

pub struct MemoCache {
    scores: Cache<String, ScoreInsight>,
    graphs: Cache<String, DependencyGraph>,
}

impl MemoCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            scores: Cache::builder().time_to_live(ttl).build(),
            graphs: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// `score:<PKG>` (upper-cased).
    pub fn score_key(package: &str) -> String {
        format!("score:{}", package.to_uppercase())
    }

    /// `deps:<PKG>:<VER>[:with-dev]` (upper-cased).
    pub fn graph_key(package: &str, version: &str, with_dev: bool) -> String {
        let mut key = format!("deps:{}:{}", package.to_uppercase(), version.to_uppercase());
        if with_dev {
            key.push_str(":with-dev");
        }
        key
    }

    /// Fetch-or-compute a score insight.
    pub async fn score_with<F, Fut>(&self, key: String, factory: F) -> Result<ScoreInsight, RegistryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ScoreInsight, RegistryError>>,
    {
        self.scores
            .try_get_with(key, factory())
            .await
            .map_err(|shared| (*shared).clone())
    }

    /// Fetch-or-compute a dependency graph.
    pub async fn graph_with<F, Fut>(
        &self,
        key: String,
        factory: F,
    ) -> Result<DependencyGraph, RegistryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DependencyGraph, RegistryError>>,
    {
        self.graphs
            .try_get_with(key, factory())
            .await
            .map_err(|shared| (*shared).clone())
    }
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
