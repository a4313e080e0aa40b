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

//! SemVer parsing helpers with pub.dev tolerances.

use crate::error::RegistryError;
use semver::Version;
use std::cmp::Ordering;

/// Parse a version string under SemVer 2.0.
///
/// pub.dev publishes build metadata (`1.2.3+4`) routinely; the semver crate
/// accepts it, and precedence comparisons below ignore it.
pub fn parse_version(input: &str) -> Result<Version, RegistryError> {
    let trimmed = input.trim();
    Version::parse(trimmed)
        .map_err(|e| RegistryError::InvalidInput(format!("invalid version '{input}': {e}")))
}

/// Whether the version carries a prerelease tag.
pub fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// SemVer precedence ordering (build metadata ignored).
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    a.cmp_precedence(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_build_metadata() {
        let v = parse_version("1.2.3+4").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.build.as_str(), "4");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_version("not-a-version").is_err());
        assert!(parse_version("1.2").is_err());
    }

    #[test]
    fn test_prerelease_detection() {
        assert!(is_prerelease(&parse_version("1.3.0-beta.1").unwrap()));
        assert!(!is_prerelease(&parse_version("1.2.1").unwrap()));
    }

    #[test]
    fn test_precedence_ignores_build_metadata() {
        let a = parse_version("1.0.0+1").unwrap();
        let b = parse_version("1.0.0+2").unwrap();
        assert_eq!(cmp_precedence(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        let pre = parse_version("1.3.0-beta.1").unwrap();
        let rel = parse_version("1.3.0").unwrap();
        assert_eq!(cmp_precedence(&pre, &rel), Ordering::Less);
    }
}
