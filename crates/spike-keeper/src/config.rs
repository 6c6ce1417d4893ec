// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment-driven keeper configuration.
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `SPIKE_KEEPER_HOST` / `SPIKE_KEEPER_PORT` | Listen address | `127.0.0.1:8443` |
//! | `SPIKE_TRUST_ROOT` | Trust domain for every role | `spike.ist` |
//! | `SPIKE_TRUST_ROOT_NEXUS` | Trust domain for the nexus peer | `SPIKE_TRUST_ROOT` |
//! | `SPIKE_KEEPER_DEV_PEER_SPIFFE_ID` | Inject a fixed peer identity (dev only) | unset |

use std::env;
use thiserror::Error;
use tracing::{info, warn};

use spike_common_core::spiffe::{SpiffeId, TrustRoots};

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid value for {key}: {reason}")]
	Parse { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct KeeperConfig {
	pub host: String,
	pub port: u16,
	pub trust_roots: TrustRoots,
	pub dev_peer_id: Option<SpiffeId>,
}

impl KeeperConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	pub fn from_env() -> Result<Self, ConfigError> {
		let host = env::var("SPIKE_KEEPER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
		let port = match env::var("SPIKE_KEEPER_PORT") {
			Ok(raw) => raw.parse().map_err(|_| ConfigError::Parse {
				key: "SPIKE_KEEPER_PORT".to_string(),
				reason: format!("{raw:?} is not a port"),
			})?,
			Err(_) => 8443,
		};

		let default_root = env::var("SPIKE_TRUST_ROOT").unwrap_or_else(|_| "spike.ist".to_string());
		let nexus_root = env::var("SPIKE_TRUST_ROOT_NEXUS").unwrap_or_else(|_| default_root.clone());
		let mut trust_roots = TrustRoots::single(default_root);
		trust_roots.nexus = nexus_root
			.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect();

		let dev_peer_id = match env::var("SPIKE_KEEPER_DEV_PEER_SPIFFE_ID") {
			Err(_) => None,
			Ok(raw) => {
				let id = SpiffeId::parse(&raw).map_err(|e| ConfigError::Parse {
					key: "SPIKE_KEEPER_DEV_PEER_SPIFFE_ID".to_string(),
					reason: e.to_string(),
				})?;
				warn!(peer = %id, "dev peer identity injection is enabled");
				Some(id)
			}
		};

		let config = Self {
			host,
			port,
			trust_roots,
			dev_peer_id,
		};
		info!(host = %config.host, port = config.port, "keeper configuration loaded");
		Ok(config)
	}
}
