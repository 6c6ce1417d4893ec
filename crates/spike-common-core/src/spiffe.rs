// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SPIFFE identity handling.
//!
//! A [`SpiffeId`] is the URI-shaped workload identity carried in the peer
//! certificate SAN. The mutual-TLS plane that validates the certificate is
//! external; this module owns the syntactic validator and the pure role
//! predicates over `(id, configured trust roots)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum byte length of a SPIFFE id, per the SPIFFE standard.
const MAX_SPIFFE_ID_LEN: usize = 2048;

/// Identity path of the SPIKE pilot superuser role.
pub const PILOT_ROLE_PATH: &str = "/spike/pilot/role/superuser";
/// Identity path of the pilot `recover` operator role.
pub const PILOT_RECOVER_ROLE_PATH: &str = "/spike/pilot/role/recover";
/// Identity path of the pilot `restore` operator role.
pub const PILOT_RESTORE_ROLE_PATH: &str = "/spike/pilot/role/restore";
/// Identity path prefix of keeper peers.
pub const KEEPER_ROLE_PATH: &str = "/spike/keeper";
/// Identity path prefix of the nexus itself (checked by keepers).
pub const NEXUS_ROLE_PATH: &str = "/spike/nexus";

/// Reasons a candidate identity string fails syntactic validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpiffeIdError {
	#[error("spiffe id is empty")]
	Empty,

	#[error("spiffe id exceeds {MAX_SPIFFE_ID_LEN} bytes")]
	TooLong,

	#[error("spiffe id must start with spiffe://")]
	MissingScheme,

	#[error("spiffe id has an empty trust domain")]
	EmptyTrustDomain,

	#[error("invalid character {0:?} in trust domain")]
	InvalidTrustDomainChar(char),

	#[error("invalid character {0:?} in path")]
	InvalidPathChar(char),

	#[error("spiffe id path contains an empty or relative segment")]
	BadPathSegment,
}

/// A syntactically valid SPIFFE id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpiffeId(String);

impl SpiffeId {
	/// Validate and wrap a candidate identity string.
	pub fn parse(candidate: &str) -> Result<Self, SpiffeIdError> {
		if candidate.is_empty() {
			return Err(SpiffeIdError::Empty);
		}
		if candidate.len() > MAX_SPIFFE_ID_LEN {
			return Err(SpiffeIdError::TooLong);
		}

		let rest = candidate
			.strip_prefix("spiffe://")
			.ok_or(SpiffeIdError::MissingScheme)?;

		let (trust_domain, path) = match rest.find('/') {
			Some(idx) => (&rest[..idx], &rest[idx..]),
			None => (rest, ""),
		};

		if trust_domain.is_empty() {
			return Err(SpiffeIdError::EmptyTrustDomain);
		}
		for c in trust_domain.chars() {
			if !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_')) {
				return Err(SpiffeIdError::InvalidTrustDomainChar(c));
			}
		}

		if !path.is_empty() {
			for segment in path[1..].split('/') {
				if segment.is_empty() || segment == "." || segment == ".." {
					return Err(SpiffeIdError::BadPathSegment);
				}
				for c in segment.chars() {
					if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')) {
						return Err(SpiffeIdError::InvalidPathChar(c));
					}
				}
			}
		}

		Ok(Self(candidate.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The trust domain component, without the scheme.
	pub fn trust_domain(&self) -> &str {
		let rest = &self.0["spiffe://".len()..];
		match rest.find('/') {
			Some(idx) => &rest[..idx],
			None => rest,
		}
	}
}

impl fmt::Display for SpiffeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// The validated peer identity, as the transport wrapper attaches it to
/// each request. The wrapper builds it from the certificate URI SAN via
/// [`PeerIdentity::from_san`], which is where the syntactic validator
/// runs; servers only ever see an already-parsed id.
#[derive(Debug, Clone)]
pub struct PeerIdentity(pub SpiffeId);

impl PeerIdentity {
	pub fn from_san(san: &str) -> Result<Self, SpiffeIdError> {
		SpiffeId::parse(san).map(Self)
	}
}

/// Authoritative trust roots for role identity, one list per role.
///
/// A role check passes when the id starts with
/// `spiffe://<root><role path>` for any configured root of that role.
/// All checks are pure predicates; nothing here consults the network.
#[derive(Debug, Clone, Default)]
pub struct TrustRoots {
	pub pilot: Vec<String>,
	pub pilot_recover: Vec<String>,
	pub pilot_restore: Vec<String>,
	pub keeper: Vec<String>,
	pub nexus: Vec<String>,
}

impl TrustRoots {
	/// All roles anchored at a single trust domain.
	pub fn single(trust_domain: impl Into<String>) -> Self {
		let td = trust_domain.into();
		Self {
			pilot: vec![td.clone()],
			pilot_recover: vec![td.clone()],
			pilot_restore: vec![td.clone()],
			keeper: vec![td.clone()],
			nexus: vec![td],
		}
	}

	pub fn is_pilot(&self, id: &SpiffeId) -> bool {
		matches_role(id, &self.pilot, PILOT_ROLE_PATH)
	}

	pub fn is_pilot_recover(&self, id: &SpiffeId) -> bool {
		matches_role(id, &self.pilot_recover, PILOT_RECOVER_ROLE_PATH)
	}

	pub fn is_pilot_restore(&self, id: &SpiffeId) -> bool {
		matches_role(id, &self.pilot_restore, PILOT_RESTORE_ROLE_PATH)
	}

	pub fn is_keeper(&self, id: &SpiffeId) -> bool {
		matches_role(id, &self.keeper, KEEPER_ROLE_PATH)
	}

	pub fn is_nexus(&self, id: &SpiffeId) -> bool {
		matches_role(id, &self.nexus, NEXUS_ROLE_PATH)
	}
}

fn matches_role(id: &SpiffeId, roots: &[String], role_path: &str) -> bool {
	roots
		.iter()
		.any(|root| id.as_str().starts_with(&format!("spiffe://{root}{role_path}")))
}
