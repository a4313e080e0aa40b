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

//! Request-processing pipeline.
//!
//! Parse → envelope check → dispatch → response shaping. Batches run
//! their elements concurrently but collect responses in request order;
//! notifications execute and produce nothing. `None` from
//! [`RpcPipeline::handle_payload`] means "no body to send".

use crate::observability;
use crate::rpc::protocol::{
    JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
};
use crate::tools::{ToolContext, ToolRegistry};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct RpcPipeline {
    tools: Arc<ToolRegistry>,
    ctx: Arc<ToolContext>,
}

impl RpcPipeline {
    pub fn new(tools: Arc<ToolRegistry>, ctx: Arc<ToolContext>) -> Self {
        Self { tools, ctx }
    }

    /// Process one framed payload (a single request or a batch).
    pub async fn handle_payload(&self, raw: &[u8], cancel: &CancellationToken) -> Option<Value> {
        let parsed: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(e) => {
                return Some(encode(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::parse_error(format!("malformed JSON: {e}")),
                )));
            }
        };

        match parsed {
            Value::Array(items) => {
                if items.is_empty() {
                    return Some(encode(JsonRpcResponse::error(
                        JsonRpcId::Null,
                        JsonRpcError::invalid_request("batch must not be empty"),
                    )));
                }
                // Handlers run concurrently; responses keep request order.
                let pending = items.into_iter().map(|item| self.process_value(item, cancel));
                let responses: Vec<Value> = join_all(pending)
                    .await
                    .into_iter()
                    .flatten()
                    .map(encode)
                    .collect();
                if responses.is_empty() {
                    None
                } else {
                    Some(Value::Array(responses))
                }
            }
            single => self.process_value(single, cancel).await.map(encode),
        }
    }

    async fn process_value(
        &self,
        item: Value,
        cancel: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_value(item) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::invalid_request(format!("malformed request object: {e}")),
                ));
            }
        };

        if !request.envelope_ok() {
            // Shape failures are answered even for would-be notifications.
            let id = request.id.clone().unwrap_or(JsonRpcId::Null);
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("request envelope is not JSON-RPC 2.0"),
            ));
        }

        let outcome = self.dispatch(&request, cancel).await;
        if request.is_notification() {
            return None;
        }

        let id = request.id.clone().unwrap_or(JsonRpcId::Null);
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    async fn dispatch(
        &self,
        request: &JsonRpcRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => Ok(initialize_result()),
            "tools/list" => Ok(self.tools.list_tools()),
            "ping" => Ok(json!({})),
            method => {
                let descriptor = self
                    .tools
                    .get(method)
                    .ok_or_else(|| JsonRpcError::method_not_found(method))?;
                let params = request.params.clone().unwrap_or_else(|| json!({}));
                observability::execute_tool(
                    descriptor,
                    &self.ctx,
                    params,
                    request.id.as_ref(),
                    cancel,
                )
                .await
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": "pubdex",
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

fn encode(response: JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}
