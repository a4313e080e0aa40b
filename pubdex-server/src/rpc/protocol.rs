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

//! JSON-RPC 2.0 message types.
//!
//! Reference: https://www.jsonrpc.org/specification and
//! https://modelcontextprotocol.io/specification

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC 2.0 protocol version
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version advertised by `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Canonical error codes.
pub mod codes {
    /// Malformed JSON.
    pub const PARSE_ERROR: i32 = -32700;
    /// Envelope shape wrong.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Parameter binding or validation failure.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Unexpected server-side failure.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Request cancelled before completion.
    pub const CANCELLED: i32 = -32001;
    /// Upstream dependency failure, including rate-limit exhaustion.
    pub const UPSTREAM_UNAVAILABLE: i32 = -32002;
}

/// JSON-RPC 2.0 ID (string, number, or null).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
    Null,
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(value) => write!(f, "{value}"),
            JsonRpcId::Number(value) => write!(f, "{value}"),
            JsonRpcId::Null => f.write_str("null"),
        }
    }
}

/// JSON-RPC 2.0 Request.
///
/// `id: None` means the field was absent, i.e. a notification. An explicit
/// `"id": null` decodes to `Some(JsonRpcId::Null)` and is answered.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default, deserialize_with = "explicit_id")]
    pub id: Option<JsonRpcId>,
}

fn explicit_id<'de, D>(deserializer: D) -> Result<Option<JsonRpcId>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonRpcId::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    /// Whether the envelope satisfies the JSON-RPC 2.0 shape rules.
    pub fn envelope_ok(&self) -> bool {
        self.jsonrpc == JSONRPC_VERSION
            && !self.method.is_empty()
            && self
                .params
                .as_ref()
                .map_or(true, |p| p.is_object() || p.is_array())
    }

    /// A request without an id is a notification.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 Response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: JsonRpcId,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: JsonRpcId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// One machine-readable validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// JSON-RPC 2.0 Error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::PARSE_ERROR,
            message: message.into(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    /// Method not found (-32601); the message carries the offending name.
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    /// Invalid params (-32602) with `data.errors = [{field, message}…]`.
    pub fn invalid_params(errors: Vec<FieldError>) -> Self {
        Self {
            code: codes::INVALID_PARAMS,
            message: "Invalid params".to_string(),
            data: Some(serde_json::json!({ "errors": errors })),
        }
    }

    /// Internal error (-32603) carrying a one-sentence human message.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::INTERNAL_ERROR,
            message: "Internal error".to_string(),
            data: Some(Value::String(message.into())),
        }
    }

    /// Request cancelled (-32001).
    pub fn cancelled() -> Self {
        Self {
            code: codes::CANCELLED,
            message: "Request cancelled".to_string(),
            data: None,
        }
    }

    /// Upstream dependency failure (-32002); data carries the last
    /// upstream status line.
    pub fn upstream_unavailable(detail: impl Into<String>) -> Self {
        Self {
            code: codes::UPSTREAM_UNAVAILABLE,
            message: "Upstream dependency failure".to_string(),
            data: Some(Value::String(detail.into())),
        }
    }
}
