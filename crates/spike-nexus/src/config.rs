// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment-driven configuration for the nexus.
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `SPIKE_NEXUS_HOST` / `SPIKE_NEXUS_PORT` | Listen address | `127.0.0.1:8553` |
//! | `SPIKE_NEXUS_MAX_SECRET_VERSIONS` | Per-path history cap | `10` |
//! | `SPIKE_NEXUS_SHAMIR_THRESHOLD` | Minimum shards to reconstruct | `2` |
//! | `SPIKE_NEXUS_KEEPERS` | `id=apiRoot` pairs, comma separated | empty |
//! | `SPIKE_NEXUS_DB_OPERATION_TIMEOUT_MS` | Backing store deadline | `5000` |
//! | `SPIKE_NEXUS_KEEPER_UPDATE_INTERVAL_SECS` | Share push period | `300` |
//! | `SPIKE_NEXUS_BOOTSTRAP_GENERATE` | Allow first-ever-init key generation | `true` |
//! | `SPIKE_TRUST_ROOT` | Trust domain for every role | `spike.ist` |
//! | `SPIKE_TRUST_ROOT_PILOT` (`_PILOT_RECOVER`, `_PILOT_RESTORE`, `_KEEPER`, `_NEXUS`) | Per-role override | `SPIKE_TRUST_ROOT` |
//! | `SPIKE_NEXUS_DEV_PEER_SPIFFE_ID` | Inject a fixed peer identity (dev only) | unset |

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use spike_common_core::spiffe::{SpiffeId, TrustRoots};

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid value for {key}: {reason}")]
	Parse { key: String, reason: String },

	#[error("configuration validation failed: {0}")]
	Validation(String),
}

/// Fully resolved nexus configuration.
#[derive(Debug, Clone)]
pub struct NexusConfig {
	pub host: String,
	pub port: u16,
	pub max_secret_versions: usize,
	pub shamir_threshold: usize,
	/// Keeper id to API root. Ids are the Shamir evaluation points and
	/// must be exactly `1..=n`.
	pub keepers: BTreeMap<u8, String>,
	pub database_operation_timeout: Duration,
	pub keeper_update_interval: Duration,
	/// Whether a cold start with no keeper quorum may mint a fresh root
	/// key (first-ever init). Disable on replacement instances so they
	/// wait for an operator restore instead.
	pub bootstrap_generate: bool,
	pub trust_roots: TrustRoots,
	/// Development escape hatch: a fixed peer identity injected into
	/// every request when no external mTLS wrapper is present.
	pub dev_peer_id: Option<SpiffeId>,
}

impl NexusConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Load and validate configuration from the environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		let config = Self {
			host: env_string("SPIKE_NEXUS_HOST", "127.0.0.1"),
			port: env_parse("SPIKE_NEXUS_PORT", 8553)?,
			max_secret_versions: env_parse("SPIKE_NEXUS_MAX_SECRET_VERSIONS", 10)?,
			shamir_threshold: env_parse("SPIKE_NEXUS_SHAMIR_THRESHOLD", 2)?,
			keepers: parse_keepers(&env_string("SPIKE_NEXUS_KEEPERS", ""))?,
			database_operation_timeout: Duration::from_millis(env_parse(
				"SPIKE_NEXUS_DB_OPERATION_TIMEOUT_MS",
				5000,
			)?),
			keeper_update_interval: Duration::from_secs(env_parse(
				"SPIKE_NEXUS_KEEPER_UPDATE_INTERVAL_SECS",
				300,
			)?),
			bootstrap_generate: env_parse("SPIKE_NEXUS_BOOTSTRAP_GENERATE", true)?,
			trust_roots: trust_roots_from_env(),
			dev_peer_id: dev_peer_from_env()?,
		};

		config.validate()?;

		info!(
			host = %config.host,
			port = config.port,
			keepers = config.keepers.len(),
			threshold = config.shamir_threshold,
			max_secret_versions = config.max_secret_versions,
			bootstrap_generate = config.bootstrap_generate,
			"nexus configuration loaded"
		);

		Ok(config)
	}

	/// Cross-field rules: `1 ≤ t ≤ n ≤ 255` when keepers are configured,
	/// and keeper ids must be exactly the evaluation points `1..=n`.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_secret_versions == 0 {
			return Err(ConfigError::Validation(
				"SPIKE_NEXUS_MAX_SECRET_VERSIONS must be at least 1".to_string(),
			));
		}
		if self.shamir_threshold == 0 {
			return Err(ConfigError::Validation(
				"SPIKE_NEXUS_SHAMIR_THRESHOLD must be at least 1".to_string(),
			));
		}
		if !self.keepers.is_empty() {
			let n = self.keepers.len();
			if self.shamir_threshold > n {
				return Err(ConfigError::Validation(format!(
					"threshold {} exceeds keeper count {}",
					self.shamir_threshold, n
				)));
			}
			let expected: Vec<u8> = (1..=n as u8).collect();
			let actual: Vec<u8> = self.keepers.keys().copied().collect();
			if expected != actual {
				return Err(ConfigError::Validation(format!(
					"keeper ids must be exactly 1..={n}, got {actual:?}"
				)));
			}
		}
		Ok(())
	}
}

fn env_string(key: &str, default: &str) -> String {
	env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	match env::var(key) {
		Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Parse {
			key: key.to_string(),
			reason: e.to_string(),
		}),
		Err(_) => Ok(default),
	}
}

/// Parse `1=https://keeper-1:8443,2=https://keeper-2:8443`.
fn parse_keepers(raw: &str) -> Result<BTreeMap<u8, String>, ConfigError> {
	let mut keepers = BTreeMap::new();
	for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
		let (id_part, api_root) = pair.split_once('=').ok_or_else(|| ConfigError::Parse {
			key: "SPIKE_NEXUS_KEEPERS".to_string(),
			reason: format!("expected id=apiRoot, got {pair:?}"),
		})?;
		let id: u8 = id_part.trim().parse().map_err(|_| ConfigError::Parse {
			key: "SPIKE_NEXUS_KEEPERS".to_string(),
			reason: format!("keeper id {id_part:?} is not a small integer"),
		})?;
		if id == 0 {
			return Err(ConfigError::Parse {
				key: "SPIKE_NEXUS_KEEPERS".to_string(),
				reason: "keeper id 0 is reserved".to_string(),
			});
		}
		if keepers.insert(id, api_root.trim().to_string()).is_some() {
			return Err(ConfigError::Parse {
				key: "SPIKE_NEXUS_KEEPERS".to_string(),
				reason: format!("duplicate keeper id {id}"),
			});
		}
	}
	Ok(keepers)
}

fn trust_roots_from_env() -> TrustRoots {
	let default_root = env_string("SPIKE_TRUST_ROOT", "spike.ist");
	let role = |key: &str| -> Vec<String> {
		env_string(key, &default_root)
			.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect()
	};
	TrustRoots {
		pilot: role("SPIKE_TRUST_ROOT_PILOT"),
		pilot_recover: role("SPIKE_TRUST_ROOT_PILOT_RECOVER"),
		pilot_restore: role("SPIKE_TRUST_ROOT_PILOT_RESTORE"),
		keeper: role("SPIKE_TRUST_ROOT_KEEPER"),
		nexus: role("SPIKE_TRUST_ROOT_NEXUS"),
	}
}

fn dev_peer_from_env() -> Result<Option<SpiffeId>, ConfigError> {
	match env::var("SPIKE_NEXUS_DEV_PEER_SPIFFE_ID") {
		Err(_) => Ok(None),
		Ok(raw) => {
			let id = SpiffeId::parse(&raw).map_err(|e| ConfigError::Parse {
				key: "SPIKE_NEXUS_DEV_PEER_SPIFFE_ID".to_string(),
				reason: e.to_string(),
			})?;
			warn!(peer = %id, "dev peer identity injection is enabled; every request will carry this identity");
			Ok(Some(id))
		}
	}
}
