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

//! Input validation at the tool boundary.
//!
//! These rules are a contract: the registry client does not re-validate.

use pubdex_core::constraint::VersionConstraint;
use pubdex_core::version::parse_version;
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("package name pattern compiles"));

static PUBLISHER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._-]+$").expect("publisher id pattern compiles"));

/// Maximum search query length after trimming.
pub const MAX_QUERY_LENGTH: usize = 80;

/// Package names are lowercase alphanumerics and underscores.
pub fn validate_package_name(value: &str) -> Result<(), String> {
    if PACKAGE_NAME.is_match(value) {
        Ok(())
    } else {
        Err(format!("'{value}' must match ^[a-z0-9_]+$"))
    }
}

/// Publisher ids additionally allow dots and dashes.
pub fn validate_publisher_id(value: &str) -> Result<(), String> {
    if PUBLISHER_ID.is_match(value) {
        Ok(())
    } else {
        Err(format!("'{value}' must match ^[a-z0-9._-]+$"))
    }
}

/// Queries must be non-empty after trimming and at most 80 characters.
pub fn validate_query(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(format!("must be at most {MAX_QUERY_LENGTH} characters"));
    }
    Ok(())
}

/// An exact semver or a parsable range.
pub fn validate_version_expression(value: &str) -> Result<(), String> {
    if parse_version(value).is_ok() {
        return Ok(());
    }
    VersionConstraint::parse(value)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// A parsable range.
pub fn validate_range(value: &str) -> Result<(), String> {
    VersionConstraint::parse(value)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
