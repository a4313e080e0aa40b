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

use anyhow::Result;
use clap::Parser;
use pubdex_server::config::{ServerConfig, TransportKind};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "MCP server over the pub.dev package registry", long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve JSON-RPC over line-delimited stdio (default)
    #[arg(long, conflicts_with = "http")]
    stdio: bool,

    /// Serve JSON-RPC over HTTP
    #[arg(long)]
    http: bool,

    /// HTTP listen address (overrides config file)
    #[arg(long, env = "PUBDEX_HTTP_ADDR")]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // File and environment first; explicit flags win.
    let mut config = ServerConfig::load(args.config)?;
    if args.http {
        config.transport = TransportKind::Http;
    }
    if args.stdio {
        config.transport = TransportKind::Stdio;
    }
    if let Some(addr) = args.listen_addr {
        config.http.listen_addr = addr;
    }

    pubdex_telemetry::init(
        "pubdex",
        &config.telemetry.exporter,
        &config.telemetry.log_level,
    )?;

    pubdex_server::run(config).await
}
