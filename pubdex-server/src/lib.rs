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

//! pubdex server: the MCP tool surface over pub.dev.

pub mod config;
pub mod observability;
pub mod rpc;
pub mod tools;
pub mod transport;
pub mod validation;

use anyhow::Result;
use config::{ServerConfig, TransportKind};
use pubdex_registry::{MemoCache, PubDevClient, RegistryApi};
use rpc::RpcPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tools::{ToolContext, ToolRegistry};
use transport::http::AppState;

pub async fn run(config: ServerConfig) -> Result<()> {
    config.validate()?;
    tracing::info!(transport = ?config.transport, "starting pubdex");

    let client = Arc::new(PubDevClient::new(&config.registry)?);
    let registry: Arc<dyn RegistryApi> = client;
    let cache = Arc::new(MemoCache::new(Duration::from_secs(config.cache.ttl_secs)));
    let ctx = Arc::new(ToolContext {
        registry: Arc::clone(&registry),
        cache,
    });
    let pipeline = Arc::new(RpcPipeline::new(Arc::new(ToolRegistry::new()), ctx));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    match config.transport {
        TransportKind::Stdio => transport::stdio::run(pipeline, cancel).await,
        TransportKind::Http => {
            let addr = config.socket_addr()?;
            let state = AppState {
                pipeline,
                registry,
                cancel: cancel.clone(),
            };
            transport::http::run(addr, state, cancel).await
        }
    }
}
