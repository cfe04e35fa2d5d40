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

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default log level when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Component name used for the log file directory and prefix
pub const LOG_COMPONENT_NAME: &str = "engine";

/// Default for console log output
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Trading engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
	/// gRPC server bind address
	pub bind_addr: SocketAddr,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			bind_addr: "0.0.0.0:5001".parse().unwrap(),
		}
	}
}

impl EngineConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("ENGINE"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("ENGINE"))
			.build()?;

		cfg.try_deserialize()
	}
}
