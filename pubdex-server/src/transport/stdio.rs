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

//! Line-delimited stdio transport.
//!
//! One JSON document per newline-terminated line in both directions;
//! blank lines are skipped. The reader loop only reads: each payload is
//! handled on its own task, so a slow handler never blocks later
//! requests. A single writer task serializes output, flushing per line.

use crate::rpc::RpcPipeline;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub async fn run(pipeline: Arc<RpcPipeline>, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    info!("stdio transport ready");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("stdio transport cancelled");
                break;
            }
            next = lines.next_line() => match next? {
                None => {
                    debug!("stdin reached EOF");
                    break;
                }
                Some(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let pipeline = Arc::clone(&pipeline);
                    let tx = tx.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        let payload = line.into_bytes();
                        if let Some(response) = pipeline.handle_payload(&payload, &cancel).await {
                            match serde_json::to_string(&response) {
                                Ok(text) => {
                                    let _ = tx.send(text).await;
                                }
                                Err(e) => error!(error = %e, "response serialization failed"),
                            }
                        }
                    });
                }
            }
        }
    }

    // Dropping the sender lets in-flight tasks finish writing, then the
    // writer drains and exits.
    drop(tx);
    writer.await??;
    Ok(())
}
