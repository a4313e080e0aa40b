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

//! pub.dev version-constraint grammar.
//!
//! Clauses separated by `||` form a disjunction; within a clause,
//! whitespace-separated comparators form a conjunction. `any` or the empty
//! string matches every version. The semver crate's `VersionReq` has no
//! disjunction and comma-separates conjunctions, so the grammar is parsed
//! here and evaluated with precedence comparisons.

use crate::version::cmp_precedence;
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Constraint parse failure.
#[derive(Debug, Clone, Error)]
#[error("invalid constraint '{input}': {reason}")]
pub struct ConstraintError {
    input: String,
    reason: String,
}

impl ConstraintError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Caret(Version),
    Ge(Version),
    Gt(Version),
    Le(Version),
    Lt(Version),
    Eq(Version),
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Caret(base) => {
                cmp_precedence(version, base) != Ordering::Less
                    && cmp_precedence(version, &caret_upper(base)) == Ordering::Less
            }
            Comparator::Ge(base) => cmp_precedence(version, base) != Ordering::Less,
            Comparator::Gt(base) => cmp_precedence(version, base) == Ordering::Greater,
            Comparator::Le(base) => cmp_precedence(version, base) != Ordering::Greater,
            Comparator::Lt(base) => cmp_precedence(version, base) == Ordering::Less,
            Comparator::Eq(base) => cmp_precedence(version, base) == Ordering::Equal,
        }
    }

    /// The smallest version the comparator admits, when it bounds below.
    fn lower_bound(&self) -> Option<&Version> {
        match self {
            Comparator::Caret(base)
            | Comparator::Ge(base)
            | Comparator::Gt(base)
            | Comparator::Eq(base) => Some(base),
            Comparator::Le(_) | Comparator::Lt(_) => None,
        }
    }
}

/// The exclusive upper edge of a caret requirement: the next leftmost
/// non-zero component bump.
fn caret_upper(base: &Version) -> Version {
    if base.major > 0 {
        Version::new(base.major + 1, 0, 0)
    } else if base.minor > 0 {
        Version::new(0, base.minor + 1, 0)
    } else {
        Version::new(0, 0, base.patch + 1)
    }
}

/// A parsed pub.dev constraint expression.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    /// Disjunction of conjunctions. Empty means "any".
    clauses: Vec<Vec<Comparator>>,
    source: String,
}

impl VersionConstraint {
    /// The constraint that admits every version.
    pub fn any() -> Self {
        Self {
            clauses: Vec::new(),
            source: "any".to_string(),
        }
    }

    /// Parse a constraint expression.
    pub fn parse(input: &str) -> Result<Self, ConstraintError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "any" {
            return Ok(Self::any());
        }

        let mut clauses = Vec::new();
        for clause_src in trimmed.split("||") {
            let clause_src = clause_src.trim();
            if clause_src.is_empty() {
                return Err(ConstraintError::new(input, "empty clause in disjunction"));
            }
            let mut clause = Vec::new();
            for token in clause_src.split_whitespace() {
                clause.push(parse_token(input, token)?);
            }
            clauses.push(clause);
        }

        Ok(Self {
            clauses,
            source: trimmed.to_string(),
        })
    }

    /// Whether the constraint admits `version`.
    pub fn matches(&self, version: &Version) -> bool {
        if self.clauses.is_empty() {
            return true;
        }
        self.clauses
            .iter()
            .any(|clause| clause.iter().all(|cmp| cmp.matches(version)))
    }

    /// Whether this is the unrestricted constraint.
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The smallest version the constraint can admit, used as the probe
    /// when a caller declares a range instead of an exact SDK version.
    ///
    /// Each clause's bound is the max of its comparators' lower bounds; the
    /// expression's bound is the min across clauses. `None` when any clause
    /// is unbounded below (or the constraint is `any`).
    pub fn lower_bound(&self) -> Option<Version> {
        let mut best: Option<Version> = None;
        for clause in &self.clauses {
            let clause_bound = clause
                .iter()
                .filter_map(Comparator::lower_bound)
                .max_by(|a, b| cmp_precedence(a, b))?
                .clone();
            best = match best {
                Some(current) if cmp_precedence(&current, &clause_bound) != Ordering::Greater => {
                    Some(current)
                }
                _ => Some(clause_bound),
            };
        }
        best
    }

    /// The expression as written.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_token(input: &str, token: &str) -> Result<Comparator, ConstraintError> {
    let (ctor, rest): (fn(Version) -> Comparator, &str) = if let Some(rest) = token.strip_prefix('^')
    {
        (Comparator::Caret, rest)
    } else if let Some(rest) = token.strip_prefix(">=") {
        (Comparator::Ge, rest)
    } else if let Some(rest) = token.strip_prefix("<=") {
        (Comparator::Le, rest)
    } else if let Some(rest) = token.strip_prefix('>') {
        (Comparator::Gt, rest)
    } else if let Some(rest) = token.strip_prefix('<') {
        (Comparator::Lt, rest)
    } else if let Some(rest) = token.strip_prefix('=') {
        (Comparator::Eq, rest)
    } else {
        // Bare version means equality.
        (Comparator::Eq, token)
    };

    let version = Version::parse(rest)
        .map_err(|e| ConstraintError::new(input, format!("bad version in '{token}': {e}")))?;
    Ok(ctor(version))
}

/// Evaluate a version's declared SDK constraint against a probe version.
///
/// `any`, the empty string, and whitespace match everything. A constraint
/// that does not parse matches nothing.
pub fn sdk_satisfies(constraint: &str, probe: &Version) -> bool {
    match VersionConstraint::parse(constraint) {
        Ok(parsed) => parsed.matches(probe),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_any_matches_everything() {
        for src in ["any", "", "   "] {
            let c = VersionConstraint::parse(src).unwrap();
            assert!(c.is_any(), "{src:?} should be any");
            assert!(c.matches(&v("0.0.1")));
            assert!(c.matches(&v("99.0.0")));
        }
    }

    #[test]
    fn test_caret_major() {
        let c = VersionConstraint::parse("^1.2.3").unwrap();
        assert!(c.matches(&v("1.2.3")));
        assert!(c.matches(&v("1.9.0")));
        assert!(!c.matches(&v("2.0.0")));
        assert!(!c.matches(&v("1.2.2")));
    }

    #[test]
    fn test_caret_zero_major() {
        let c = VersionConstraint::parse("^0.2.3").unwrap();
        assert!(c.matches(&v("0.2.9")));
        assert!(!c.matches(&v("0.3.0")));

        let c = VersionConstraint::parse("^0.0.3").unwrap();
        assert!(c.matches(&v("0.0.3")));
        assert!(!c.matches(&v("0.0.4")));
    }

    #[test]
    fn test_range_conjunction() {
        let c = VersionConstraint::parse(">=3.13.0 <4.0.0").unwrap();
        assert!(c.matches(&v("3.24.0")));
        assert!(c.matches(&v("3.13.0")));
        assert!(!c.matches(&v("4.0.0")));
        assert!(!c.matches(&v("2.0.0")));
    }

    #[test]
    fn test_disjunction() {
        let c = VersionConstraint::parse(">=1.0.0 <2.0.0 || >=3.0.0").unwrap();
        assert!(c.matches(&v("1.5.0")));
        assert!(!c.matches(&v("2.5.0")));
        assert!(c.matches(&v("3.1.0")));
    }

    #[test]
    fn test_bare_version_is_equality() {
        let c = VersionConstraint::parse("1.2.3").unwrap();
        assert!(c.matches(&v("1.2.3")));
        assert!(!c.matches(&v("1.2.4")));

        let c = VersionConstraint::parse("=1.2.3").unwrap();
        assert!(c.matches(&v("1.2.3")));
    }

    #[test]
    fn test_lower_bound() {
        assert_eq!(
            VersionConstraint::parse("^3.22.0").unwrap().lower_bound(),
            Some(v("3.22.0"))
        );
        assert_eq!(
            VersionConstraint::parse(">=3.13.0 <4.0.0").unwrap().lower_bound(),
            Some(v("3.13.0"))
        );
        assert_eq!(
            VersionConstraint::parse(">=1.0.0 || >=3.0.0").unwrap().lower_bound(),
            Some(v("1.0.0"))
        );
        assert_eq!(VersionConstraint::parse("<4.0.0").unwrap().lower_bound(), None);
        assert_eq!(VersionConstraint::any().lower_bound(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(VersionConstraint::parse(">=banana").is_err());
        assert!(VersionConstraint::parse("|| >=1.0.0").is_err());
    }

    #[test]
    fn test_sdk_satisfies() {
        let probe = v("3.24.0");
        assert!(sdk_satisfies(">=3.13.0 <4.0.0", &probe));
        assert!(sdk_satisfies("any", &probe));
        assert!(sdk_satisfies("", &probe));
        assert!(!sdk_satisfies(">=4.0.0", &probe));
        // Unparseable constraints never satisfy.
        assert!(!sdk_satisfies(">=not.a.version", &probe));
    }
}
