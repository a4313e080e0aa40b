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

//! Audit records for tool executions.

use super::InvariantError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One tool call, reduced to digests for tamper-evident logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "AuditLogEntryRaw")]
pub struct AuditLogEntry {
    timestamp: DateTime<Utc>,
    tool: String,
    request_digest: String,
    response_digest: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditLogEntryRaw {
    timestamp: DateTime<Utc>,
    tool: String,
    request_digest: String,
    response_digest: String,
}

impl TryFrom<AuditLogEntryRaw> for AuditLogEntry {
    type Error = InvariantError;

    fn try_from(raw: AuditLogEntryRaw) -> Result<Self, Self::Error> {
        AuditLogEntry::new(raw.timestamp, raw.tool, raw.request_digest, raw.response_digest)
    }
}

impl AuditLogEntry {
    /// Build an entry from pre-computed digests (hex SHA-256).
    pub fn new(
        timestamp: DateTime<Utc>,
        tool: impl Into<String>,
        request_digest: impl Into<String>,
        response_digest: impl Into<String>,
    ) -> Result<Self, InvariantError> {
        let tool = tool.into();
        if tool.trim().is_empty() {
            return Err(InvariantError::new("AuditLogEntry", "tool", "must not be empty"));
        }
        let request_digest = request_digest.into();
        let response_digest = response_digest.into();
        check_digest("requestDigest", &request_digest)?;
        check_digest("responseDigest", &response_digest)?;
        Ok(Self {
            timestamp,
            tool,
            request_digest,
            response_digest,
        })
    }

    /// Hash the raw request/response payloads into an entry.
    pub fn record(
        timestamp: DateTime<Utc>,
        tool: impl Into<String>,
        request_payload: &[u8],
        response_payload: &[u8],
    ) -> Result<Self, InvariantError> {
        Self::new(timestamp, tool, digest_hex(request_payload), digest_hex(response_payload))
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn request_digest(&self) -> &str {
        &self.request_digest
    }

    pub fn response_digest(&self) -> &str {
        &self.response_digest
    }
}

fn digest_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn check_digest(field: &'static str, value: &str) -> Result<(), InvariantError> {
    let valid = value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
    if valid {
        Ok(())
    } else {
        Err(InvariantError::new(
            "AuditLogEntry",
            field,
            "expected 64 lowercase hex characters",
        ))
    }
}
