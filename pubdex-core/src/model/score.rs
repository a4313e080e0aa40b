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

//! Aggregated package-score values.

use super::InvariantError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A package's aggregated quality signals at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ScoreInsightRaw")]
pub struct ScoreInsight {
    package: String,
    overall_score: u64,
    popularity: f64,
    likes: u64,
    pub_points: u64,
    component_notes: BTreeMap<String, String>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreInsightRaw {
    package: String,
    overall_score: u64,
    popularity: f64,
    likes: u64,
    pub_points: u64,
    #[serde(default)]
    component_notes: BTreeMap<String, String>,
    fetched_at: DateTime<Utc>,
}

impl TryFrom<ScoreInsightRaw> for ScoreInsight {
    type Error = InvariantError;

    fn try_from(raw: ScoreInsightRaw) -> Result<Self, Self::Error> {
        ScoreInsight::new(
            raw.package,
            raw.overall_score,
            raw.popularity,
            raw.likes,
            raw.pub_points,
            raw.component_notes,
            raw.fetched_at,
        )
    }
}

impl ScoreInsight {
    /// Component-note keys are lower-cased on the way in.
    pub fn new(
        package: impl Into<String>,
        overall_score: u64,
        popularity: f64,
        likes: u64,
        pub_points: u64,
        component_notes: BTreeMap<String, String>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, InvariantError> {
        let package = package.into();
        if package.trim().is_empty() {
            return Err(InvariantError::new("ScoreInsight", "package", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&popularity) || popularity.is_nan() {
            return Err(InvariantError::new(
                "ScoreInsight",
                "popularity",
                format!("{popularity} outside [0, 1]"),
            ));
        }
        let component_notes = component_notes
            .into_iter()
            .map(|(key, note)| (key.to_lowercase(), note))
            .collect();
        Ok(Self {
            package,
            overall_score,
            popularity,
            likes,
            pub_points,
            component_notes,
            fetched_at,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn overall_score(&self) -> u64 {
        self.overall_score
    }

    pub fn popularity(&self) -> f64 {
        self.popularity
    }

    pub fn likes(&self) -> u64 {
        self.likes
    }

    pub fn pub_points(&self) -> u64 {
        self.pub_points
    }

    pub fn component_notes(&self) -> &BTreeMap<String, String> {
        &self.component_notes
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}
