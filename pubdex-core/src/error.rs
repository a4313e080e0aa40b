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

//! Registry error taxonomy.

use thiserror::Error;

/// Errors produced by the registry client and everything layered on it.
///
/// The variants mirror the failure classes a caller can meaningfully react
/// to: client faults (`InvalidInput`), upstream faults that were already
/// retried (`UpstreamUnavailable`, `RateLimited`), missing entities
/// (`NotFound`), wire breakage (`DecodeFailed`), and cancellation.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The caller supplied input the upstream rejected or that failed a
    /// precondition owned by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The upstream could not be reached or kept failing after the
    /// resilience pipeline was exhausted.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The requested package or publisher does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream throttled us (HTTP 408/429).
    #[error("upstream rate limited: {0}")]
    RateLimited(String),

    /// The upstream answered but the payload was missing required fields
    /// or was otherwise undecodable.
    #[error("failed to decode upstream response: {0}")]
    DecodeFailed(String),

    /// The surrounding request was cancelled.
    #[error("request cancelled")]
    Cancelled,
}

impl RegistryError {
    /// Whether a retry can plausibly change the outcome.
    ///
    /// Transient transport failures, 5xx, and 408/429 are retried; client
    /// faults, missing entities, decode failures, and cancellation are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::UpstreamUnavailable(_) | RegistryError::RateLimited(_)
        )
    }
}
