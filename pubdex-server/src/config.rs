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

//! Server configuration: TOML file plus environment overrides.
//!
//! Recognized environment variables:
//! - `MCP_TRANSPORT` (`STDIO` | `HTTP`)
//! - `MCP_LOG_LEVEL` (minimum log severity, e.g. `debug`)
//! - `MCP_TELEMETRY_EXPORTER` (`NONE` | `CONSOLE` | `OTLP`)
//! - `PUBDEX_HTTP_ADDR` (HTTP listen address)
//! - the `PUBDEV_API_*` / `PUBDEV_RESILIENCE_*` set (see
//!   `pubdex_registry::config`)

use anyhow::Result;
use pubdex_registry::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            other => Err(format!("unknown transport '{other}' (expected STDIO or HTTP)")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default)]
    pub http: HttpConfig,

    /// `[api]` and `[resilience]` sections.
    #[serde(flatten)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// HTTP listen address (e.g. "127.0.0.1:8310").
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Memoization TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `none`, `console`, or `otlp`.
    #[serde(default = "default_exporter")]
    pub exporter: String,

    /// Minimum log severity when `MCP_LOG_LEVEL` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8310".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_exporter() -> String {
    "none".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            exporter: default_exporter(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load with priority: environment > file > defaults.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };
        config.merge_env();
        Ok(config)
    }

    fn merge_env(&mut self) {
        if let Ok(value) = std::env::var("MCP_TRANSPORT") {
            if let Ok(parsed) = value.parse() {
                self.transport = parsed;
            }
        }
        if let Ok(value) = std::env::var("MCP_LOG_LEVEL") {
            self.telemetry.log_level = value;
        }
        if let Ok(value) = std::env::var("MCP_TELEMETRY_EXPORTER") {
            self.telemetry.exporter = value;
        }
        if let Ok(value) = std::env::var("PUBDEX_HTTP_ADDR") {
            self.http.listen_addr = value;
        }
        self.registry.merge_env();
    }

    /// Parse the HTTP listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.http.listen_addr.parse()?)
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.transport == TransportKind::Http {
            self.socket_addr()?;
        }
        let exporter = self.telemetry.exporter.to_ascii_lowercase();
        if !matches!(exporter.as_str(), "none" | "console" | "otlp") {
            anyhow::bail!(
                "unknown telemetry exporter '{}' (expected NONE, CONSOLE, or OTLP)",
                self.telemetry.exporter
            );
        }
        Ok(())
    }
}
