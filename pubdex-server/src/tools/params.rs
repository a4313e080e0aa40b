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

//! Tool parameter binding and validation.
//!
//! Required fields are bound as options so a missing field turns into a
//! named `{field, message}` record instead of an opaque serde error.

use super::ToolError;
use crate::rpc::protocol::FieldError;
use crate::validation;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Deserialize the params object into a typed request.
pub fn bind<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| {
        ToolError::InvalidParams(vec![FieldError::new("params", e.to_string())])
    })
}

fn fail(errors: Vec<FieldError>) -> Result<(), ToolError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ToolError::InvalidParams(errors))
    }
}

fn require<'a>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&'a String>,
) -> Option<&'a String> {
    if value.is_none() {
        errors.push(FieldError::new(field, "missing required field"));
    }
    value
}

/// `search_packages`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: Option<String>,
    #[serde(default)]
    pub include_prerelease: bool,
    #[serde(default)]
    pub sdk_constraint: Option<String>,
}

impl SearchParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut errors = Vec::new();
        if let Some(query) = require(&mut errors, "query", self.query.as_ref()) {
            if let Err(message) = validation::validate_query(query) {
                errors.push(FieldError::new("query", message));
            }
        }
        if let Some(expr) = &self.sdk_constraint {
            if let Err(message) = validation::validate_version_expression(expr) {
                errors.push(FieldError::new("sdkConstraint", message));
            }
        }
        fail(errors)
    }
}

/// `latest_version`, `package_details`, `score_insights`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageParams {
    pub package: Option<String>,
}

impl PackageParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut errors = Vec::new();
        if let Some(package) = require(&mut errors, "package", self.package.as_ref()) {
            if let Err(message) = validation::validate_package_name(package) {
                errors.push(FieldError::new("package", message));
            }
        }
        fail(errors)
    }
}

/// `list_versions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVersionsParams {
    pub package: Option<String>,
    #[serde(default)]
    pub take: Option<i64>,
}

impl ListVersionsParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut errors = Vec::new();
        if let Some(package) = require(&mut errors, "package", self.package.as_ref()) {
            if let Err(message) = validation::validate_package_name(package) {
                errors.push(FieldError::new("package", message));
            }
        }
        fail(errors)
    }

    /// Defaults to 50, clamped to `[1, 200]`.
    pub fn effective_take(&self) -> usize {
        self.take.unwrap_or(50).clamp(1, 200) as usize
    }
}

/// `check_compatibility`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityParams {
    pub package: Option<String>,
    pub flutter_sdk: Option<String>,
    #[serde(default)]
    pub project_constraint: Option<String>,
}

impl CompatibilityParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut errors = Vec::new();
        if let Some(package) = require(&mut errors, "package", self.package.as_ref()) {
            if let Err(message) = validation::validate_package_name(package) {
                errors.push(FieldError::new("package", message));
            }
        }
        if let Some(sdk) = require(&mut errors, "flutterSdk", self.flutter_sdk.as_ref()) {
            if let Err(message) = validation::validate_version_expression(sdk) {
                errors.push(FieldError::new("flutterSdk", message));
            }
        }
        if let Some(range) = &self.project_constraint {
            if let Err(message) = validation::validate_range(range) {
                errors.push(FieldError::new("projectConstraint", message));
            }
        }
        fail(errors)
    }
}

/// `publisher_packages`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherParams {
    pub publisher: Option<String>,
}

impl PublisherParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut errors = Vec::new();
        if let Some(publisher) = require(&mut errors, "publisher", self.publisher.as_ref()) {
            if let Err(message) = validation::validate_publisher_id(publisher) {
                errors.push(FieldError::new("publisher", message));
            }
        }
        fail(errors)
    }
}

/// `dependency_inspector`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyParams {
    pub package: Option<String>,
    /// Empty or absent means "latest stable"; otherwise an exact version
    /// or a constraint for the builder to resolve.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub include_dev_dependencies: bool,
}

impl DependencyParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut errors = Vec::new();
        if let Some(package) = require(&mut errors, "package", self.package.as_ref()) {
            if let Err(message) = validation::validate_package_name(package) {
                errors.push(FieldError::new("package", message));
            }
        }
        fail(errors)
    }
}
