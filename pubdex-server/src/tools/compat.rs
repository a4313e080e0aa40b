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

//! SDK-compatibility solver.
//!
//! Given a request and a version history (newest release first), probe at
//! most the 20 newest versions: stable candidates win; prereleases are a
//! fallback; the project constraint, when present, is a hard filter.

use pubdex_core::constraint::{sdk_satisfies, VersionConstraint};
use pubdex_core::model::{CompatibilityRequest, CompatibilityResult, InvariantError, VersionDetail};
use pubdex_core::version::cmp_precedence;

/// How many of the newest versions are evaluated.
pub const EVALUATION_WINDOW: usize = 20;

pub fn solve(
    request: &CompatibilityRequest,
    history: &[VersionDetail],
) -> Result<CompatibilityResult, InvariantError> {
    let probe = request.probe_version();
    let project = request
        .project_constraint()
        .and_then(|range| VersionConstraint::parse(range).ok());

    let window: Vec<&VersionDetail> = history.iter().take(EVALUATION_WINDOW).collect();
    let evaluated: Vec<VersionDetail> = window.iter().map(|v| (*v).clone()).collect();

    let candidates = |allow_prerelease: bool| -> Vec<&VersionDetail> {
        window
            .iter()
            .copied()
            .filter(|version| {
                sdk_satisfies(version.sdk_constraint(), &probe)
                    && project
                        .as_ref()
                        .map_or(true, |range| range.matches(&version.parsed_version()))
                    && (allow_prerelease || !version.is_prerelease())
            })
            .collect()
    };

    if let Some(best) = newest(&candidates(false)) {
        let explanation = format!(
            "{}@{} supports Flutter SDK {probe} (sdk constraint '{}'); {} versions evaluated",
            request.package(),
            best.version(),
            best.sdk_constraint(),
            window.len(),
        );
        return CompatibilityResult::new(
            request.clone(),
            Some(best.clone()),
            true,
            explanation,
            evaluated,
        );
    }

    if let Some(best) = newest(&candidates(true)) {
        let explanation = format!(
            "No stable release of {} supports Flutter SDK {probe}; falling back to \
             prerelease {}@{} (sdk constraint '{}'); {} versions evaluated",
            request.package(),
            request.package(),
            best.version(),
            best.sdk_constraint(),
            window.len(),
        );
        return CompatibilityResult::new(
            request.clone(),
            Some(best.clone()),
            true,
            explanation,
            evaluated,
        );
    }

    let mut explanation = format!(
        "Evaluated {} versions of {}; none declare an SDK constraint admitting Flutter SDK {probe}",
        window.len(),
        request.package(),
    );
    if let Some(range) = request.project_constraint() {
        explanation.push_str(&format!(" within the project constraint '{range}'"));
    }
    CompatibilityResult::new(request.clone(), None, false, explanation, evaluated)
}

/// Newest by release time, ties broken by parsed semver descending.
fn newest<'a>(candidates: &[&'a VersionDetail]) -> Option<&'a VersionDetail> {
    candidates.iter().copied().max_by(|a, b| {
        a.released()
            .cmp(&b.released())
            .then_with(|| cmp_precedence(&a.parsed_version(), &b.parsed_version()))
    })
}
