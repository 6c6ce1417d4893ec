// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CLI configuration from the environment.
//!
//! The operator's own identity comes from the external SVID plane; the
//! wrapper that terminates the workload API hands it over in
//! `SPIKE_OPERATOR_SPIFFE_ID`. Role checks against the trust roots run
//! locally before any request leaves the machine, so a missing role
//! fails fast with a clear message instead of a remote 401.

use std::env;
use std::path::PathBuf;

use spike_common_core::spiffe::{SpiffeId, TrustRoots};

use crate::error::{CliError, Result};

#[derive(Debug, Clone)]
pub struct OperatorConfig {
	/// Base URL of the nexus API.
	pub api_url: String,
	/// The operator's validated identity.
	pub spiffe_id: SpiffeId,
	pub trust_roots: TrustRoots,
	/// Where `operator recover` writes shard files.
	pub recovery_dir: PathBuf,
}

impl OperatorConfig {
	pub fn from_env() -> Result<Self> {
		let api_url = env::var("SPIKE_NEXUS_API_URL")
			.unwrap_or_else(|_| "https://localhost:8553".to_string());

		let raw_id = env::var("SPIKE_OPERATOR_SPIFFE_ID").map_err(|_| {
			CliError::Config(
				"SPIKE_OPERATOR_SPIFFE_ID is not set; is the identity wrapper running?"
					.to_string(),
			)
		})?;
		let spiffe_id = SpiffeId::parse(&raw_id)
			.map_err(|e| CliError::Config(format!("invalid operator identity: {e}")))?;

		let default_root = env::var("SPIKE_TRUST_ROOT").unwrap_or_else(|_| "spike.ist".to_string());
		let trust_roots = TrustRoots::single(default_root);

		let recovery_dir = match env::var("SPIKE_PILOT_RECOVERY_DIR") {
			Ok(dir) => PathBuf::from(dir),
			Err(_) => {
				let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
				PathBuf::from(home).join(".spike").join("recovery")
			}
		};

		Ok(Self {
			api_url,
			spiffe_id,
			trust_roots,
			recovery_dir,
		})
	}
}
