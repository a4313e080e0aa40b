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

//! Per-request observability: span, structured log line, audit digest.

use crate::rpc::protocol::{JsonRpcError, JsonRpcId};
use crate::tools::{ToolContext, ToolDescriptor};
use chrono::Utc;
use pubdex_core::model::AuditLogEntry;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{field::Empty, info_span, Instrument};

/// Run one tool execution inside its `mcp.<tool>` span, emit the
/// structured log line and audit record, and map the outcome onto the
/// JSON-RPC error set.
pub async fn execute_tool(
    descriptor: &ToolDescriptor,
    ctx: &ToolContext,
    params: Value,
    request_id: Option<&JsonRpcId>,
    cancel: &CancellationToken,
) -> Result<Value, JsonRpcError> {
    let id_text = request_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "notification".to_string());
    let span = info_span!(
        "mcp.tool",
        otel.name = %format!("mcp.{}", descriptor.name),
        rpc.system = "jsonrpc",
        rpc.method = descriptor.name,
        rpc.request.id = %id_text,
        rpc.status_code = Empty,
        rpc.error_code = Empty,
    );
    let correlator = span.id().map(|id| id.into_u64()).unwrap_or_default();

    let request_payload = serde_json::to_vec(&params).unwrap_or_default();
    let started = std::time::Instant::now();
    let result = descriptor
        .run(ctx, params, cancel)
        .instrument(span.clone())
        .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let status = match &result {
        Ok(_) => "OK",
        Err(err) => err.status_label(),
    };
    span.record("rpc.status_code", status);

    let mapped = result.map_err(|err| err.to_rpc_error());
    if status == "ERROR" {
        if let Err(rpc_error) = &mapped {
            span.record("rpc.error_code", rpc_error.code);
        }
    }

    let response_payload = match &mapped {
        Ok(value) => serde_json::to_vec(value).unwrap_or_default(),
        Err(rpc_error) => serde_json::to_vec(rpc_error).unwrap_or_default(),
    };
    match AuditLogEntry::record(Utc::now(), descriptor.name, &request_payload, &response_payload) {
        Ok(entry) => tracing::info!(
            target: "audit",
            tool = entry.tool(),
            timestamp = %entry.timestamp(),
            request_digest = entry.request_digest(),
            response_digest = entry.response_digest(),
            trace_id = correlator,
            "tool call audited",
        ),
        Err(err) => tracing::warn!(target: "audit", error = %err, "audit entry rejected"),
    }

    tracing::info!(
        target: "pubdex::rpc",
        tool = descriptor.name,
        rpc.status_code = status,
        rpc.request.id = %id_text,
        elapsed_ms,
        trace_id = correlator,
        "tool execution finished",
    );

    mapped
}
