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

//! Upstream client configuration.
//!
//! TOML sections `[api]` and `[resilience]`, each overridable from the
//! environment:
//! - `PUBDEV_API_BASE_ADDRESS`, `PUBDEV_API_USER_AGENT`,
//!   `PUBDEV_API_SEARCH_RESULT_LIMIT`
//! - `PUBDEV_RESILIENCE_RETRY_COUNT`, `PUBDEV_RESILIENCE_RETRY_BASE_DELAY_MS`,
//!   `PUBDEV_RESILIENCE_TIMEOUT_MS`,
//!   `PUBDEV_RESILIENCE_CIRCUIT_BREAKER_FAILURES`,
//!   `PUBDEV_RESILIENCE_CIRCUIT_BREAKER_WINDOW_SECS`,
//!   `PUBDEV_RESILIENCE_CIRCUIT_BREAKER_DURATION_SECS`

use pubdex_core::resilience::{BreakerConfig, ResiliencePipeline, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registry client configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Absolute upstream base URL.
    #[serde(default = "default_base_address")]
    pub base_address: String,

    /// User-Agent header sent with every upstream call.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Max packages kept per search.
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResilienceConfig {
    /// Max attempts per upstream call, including the first.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff delay in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum calls in the window before the breaker ratio applies.
    #[serde(default = "default_breaker_failures")]
    pub circuit_breaker_failures: u32,

    /// Sliding window in seconds.
    #[serde(default = "default_breaker_window_secs")]
    pub circuit_breaker_window_secs: u64,

    /// Open-state duration in seconds.
    #[serde(default = "default_breaker_duration_secs")]
    pub circuit_breaker_duration_secs: u64,
}

fn default_base_address() -> String {
    "https://pub.dev".to_string()
}

fn default_user_agent() -> String {
    format!("pubdex/{} (+https://github.com/pubdex/pubdex)", env!("CARGO_PKG_VERSION"))
}

fn default_search_result_limit() -> usize {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_breaker_failures() -> u32 {
    5
}

fn default_breaker_window_secs() -> u64 {
    30
}

fn default_breaker_duration_secs() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_address: default_base_address(),
            user_agent: default_user_agent(),
            search_result_limit: default_search_result_limit(),
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            timeout_ms: default_timeout_ms(),
            circuit_breaker_failures: default_breaker_failures(),
            circuit_breaker_window_secs: default_breaker_window_secs(),
            circuit_breaker_duration_secs: default_breaker_duration_secs(),
        }
    }
}

impl RegistryConfig {
    /// Apply environment overrides on top of the current values.
    pub fn merge_env(&mut self) {
        if let Ok(value) = std::env::var("PUBDEV_API_BASE_ADDRESS") {
            self.api.base_address = value;
        }
        if let Ok(value) = std::env::var("PUBDEV_API_USER_AGENT") {
            self.api.user_agent = value;
        }
        if let Ok(value) = std::env::var("PUBDEV_API_SEARCH_RESULT_LIMIT") {
            if let Ok(parsed) = value.parse() {
                self.api.search_result_limit = parsed;
            }
        }
        if let Ok(value) = std::env::var("PUBDEV_RESILIENCE_RETRY_COUNT") {
            if let Ok(parsed) = value.parse() {
                self.resilience.retry_count = parsed;
            }
        }
        if let Ok(value) = std::env::var("PUBDEV_RESILIENCE_RETRY_BASE_DELAY_MS") {
            if let Ok(parsed) = value.parse() {
                self.resilience.retry_base_delay_ms = parsed;
            }
        }
        if let Ok(value) = std::env::var("PUBDEV_RESILIENCE_TIMEOUT_MS") {
            if let Ok(parsed) = value.parse() {
                self.resilience.timeout_ms = parsed;
            }
        }
        if let Ok(value) = std::env::var("PUBDEV_RESILIENCE_CIRCUIT_BREAKER_FAILURES") {
            if let Ok(parsed) = value.parse() {
                self.resilience.circuit_breaker_failures = parsed;
            }
        }
        if let Ok(value) = std::env::var("PUBDEV_RESILIENCE_CIRCUIT_BREAKER_WINDOW_SECS") {
            if let Ok(parsed) = value.parse() {
                self.resilience.circuit_breaker_window_secs = parsed;
            }
        }
        if let Ok(value) = std::env::var("PUBDEV_RESILIENCE_CIRCUIT_BREAKER_DURATION_SECS") {
            if let Ok(parsed) = value.parse() {
                self.resilience.circuit_breaker_duration_secs = parsed;
            }
        }
    }

    /// The retry/timeout half of the pipeline.
    pub fn pipeline(&self) -> ResiliencePipeline {
        ResiliencePipeline {
            retry: RetryPolicy {
                max_attempts: self.resilience.retry_count,
                base_delay: Duration::from_millis(self.resilience.retry_base_delay_ms),
            },
            attempt_timeout: Duration::from_millis(self.resilience.timeout_ms),
        }
    }

    /// The breaker half of the pipeline.
    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            window: Duration::from_secs(self.resilience.circuit_breaker_window_secs),
            min_throughput: self.resilience.circuit_breaker_failures,
            failure_ratio: 0.5,
            open_duration: Duration::from_secs(self.resilience.circuit_breaker_duration_secs),
        }
    }
}
