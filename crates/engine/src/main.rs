// Copyright 2025 chenjjiaa
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

//! Trading engine service entry point
//!
//! Runs the order book behind its gRPC surface and shuts down cleanly on
//! ctrl-c: in-flight calls complete, then dropping the book joins the
//! day-order expiry thread.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tonic::transport::Server;
use tracing::info;

use crucible_engine::Orderbook;
use crucible_engine::config::EngineConfig;
use crucible_engine::logging::init_logging;
use crucible_engine::server;

#[tokio::main]
async fn main() -> Result<()> {
	// Initialize logging first
	init_logging()?;

	let config = match std::env::var("ENGINE_CONFIG") {
		Ok(path) => EngineConfig::from_file(&path)
			.with_context(|| format!("Failed to load config from {}", path))?,
		Err(_) => EngineConfig::from_env().unwrap_or_default(),
	};

	info!("Starting Crucible Trading Engine on {}", config.bind_addr);

	let book = Arc::new(Orderbook::new());
	let service = server::create_server(book);

	Server::builder()
		.add_service(service)
		.serve_with_shutdown(config.bind_addr, async {
			signal::ctrl_c().await.ok();
			info!("Shutting down...");
		})
		.await
		.context("Failed to run trading engine server")?;

	Ok(())
}
