// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-control policy data types.
//!
//! A policy maps `(caller identity pattern, resource-path pattern)` to a
//! permission set. Patterns are either the `*` wildcard or a regular
//! expression compiled eagerly at creation time. Non-wildcard patterns are
//! **anchored**: a pattern must match the whole candidate string, never a
//! substring of it.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::spiffe::SpiffeId;

/// The `*` wildcard, matching any identity or any path.
pub const WILDCARD: &str = "*";

/// Permissions a policy can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPermission {
	Read,
	Write,
	List,
	/// Implies every other permission.
	Super,
}

/// Errors from policy creation and recompilation.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
	#[error("policy not found")]
	NotFound,

	#[error("policy already exists")]
	AlreadyExists,

	#[error("invalid policy: {0}")]
	Invalid(String),
}

/// An access-control policy.
///
/// The compiled regexes are not serialized; a policy loaded back from the
/// backing store must be passed through [`Policy::recompile`] before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
	pub id: Uuid,
	pub name: String,
	pub spiffe_id_pattern: String,
	pub path_pattern: String,
	pub permissions: Vec<PolicyPermission>,
	pub created_at: DateTime<Utc>,

	#[serde(skip)]
	id_regex: Option<Regex>,
	#[serde(skip)]
	path_regex: Option<Regex>,
}

impl Policy {
	/// Build a policy, compiling both patterns eagerly.
	///
	/// Returns [`PolicyError::Invalid`] on an empty name or a pattern that
	/// fails to compile.
	pub fn new(
		name: impl Into<String>,
		spiffe_id_pattern: impl Into<String>,
		path_pattern: impl Into<String>,
		permissions: Vec<PolicyPermission>,
	) -> Result<Self, PolicyError> {
		let name = name.into();
		if name.is_empty() {
			return Err(PolicyError::Invalid("policy name is empty".to_string()));
		}

		let mut policy = Self {
			id: Uuid::new_v4(),
			name,
			spiffe_id_pattern: spiffe_id_pattern.into(),
			path_pattern: path_pattern.into(),
			permissions,
			created_at: Utc::now(),
			id_regex: None,
			path_regex: None,
		};
		policy.recompile()?;
		Ok(policy)
	}

	/// Recompile the anchored pattern regexes after deserialization.
	pub fn recompile(&mut self) -> Result<(), PolicyError> {
		self.id_regex = compile_anchored(&self.spiffe_id_pattern, "spiffeid pattern")?;
		self.path_regex = compile_anchored(&self.path_pattern, "path pattern")?;
		Ok(())
	}

	/// Whether this policy's identity pattern covers `id`.
	pub fn matches_spiffe_id(&self, id: &SpiffeId) -> bool {
		match &self.id_regex {
			None => true, // wildcard
			Some(re) => re.is_match(id.as_str()),
		}
	}

	/// Whether this policy's path pattern covers `path`.
	pub fn matches_path(&self, path: &str) -> bool {
		match &self.path_regex {
			None => true, // wildcard
			Some(re) => re.is_match(path),
		}
	}

	/// Whether the granted permission set satisfies `wants`.
	///
	/// `Super` satisfies everything; otherwise every wanted permission must
	/// be present.
	pub fn allows(&self, wants: &[PolicyPermission]) -> bool {
		if self.permissions.contains(&PolicyPermission::Super) {
			return true;
		}
		wants.iter().all(|w| self.permissions.contains(w))
	}
}

fn compile_anchored(pattern: &str, what: &str) -> Result<Option<Regex>, PolicyError> {
	if pattern == WILDCARD {
		return Ok(None);
	}
	Regex::new(&format!("^(?:{pattern})$"))
		.map(Some)
		.map_err(|e| PolicyError::Invalid(format!("invalid {what}: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(s: &str) -> SpiffeId {
		SpiffeId::parse(s).unwrap()
	}

	mod creation {
		use super::*;

		#[test]
		fn compiles_patterns_eagerly() {
			let policy = Policy::new(
				"workloads",
				"spiffe://example\\.org/app/.*",
				"tenants/.*",
				vec![PolicyPermission::Read],
			)
			.unwrap();
			assert!(policy.matches_spiffe_id(&id("spiffe://example.org/app/web")));
			assert!(policy.matches_path("tenants/demo/db"));
		}

		#[test]
		fn rejects_empty_name() {
			let result = Policy::new("", "*", "*", vec![PolicyPermission::Read]);
			assert!(matches!(result, Err(PolicyError::Invalid(_))));
		}

		#[test]
		fn rejects_bad_regex() {
			let result = Policy::new("p", "[unclosed", "*", vec![PolicyPermission::Read]);
			assert!(matches!(result, Err(PolicyError::Invalid(_))));
		}

		#[test]
		fn survives_serde_roundtrip_after_recompile() {
			let policy = Policy::new("p", "spiffe://x/app", "db/.*", vec![PolicyPermission::Write])
				.unwrap();
			let json = serde_json::to_string(&policy).unwrap();
			let mut restored: Policy = serde_json::from_str(&json).unwrap();
			restored.recompile().unwrap();
			assert_eq!(restored.id, policy.id);
			assert!(restored.matches_path("db/creds"));
			assert!(!restored.matches_path("other"));
		}
	}

	mod matching {
		use super::*;

		#[test]
		fn wildcard_matches_anything() {
			let policy = Policy::new("p", "*", "*", vec![PolicyPermission::Read]).unwrap();
			assert!(policy.matches_spiffe_id(&id("spiffe://anything.at/all")));
			assert!(policy.matches_path("any/path"));
		}

		#[test]
		fn patterns_are_anchored_not_substring() {
			let policy =
				Policy::new("p", "spiffe://x/app", "db", vec![PolicyPermission::Read]).unwrap();
			assert!(policy.matches_spiffe_id(&id("spiffe://x/app")));
			assert!(!policy.matches_spiffe_id(&id("spiffe://x/app2")));
			assert!(!policy.matches_spiffe_id(&id("spiffe://x/prefix/app")));
			assert!(policy.matches_path("db"));
			assert!(!policy.matches_path("db/creds"));
			assert!(!policy.matches_path("mydb"));
		}

		#[test]
		fn super_grants_everything() {
			let policy = Policy::new("p", "*", "*", vec![PolicyPermission::Super]).unwrap();
			assert!(policy.allows(&[
				PolicyPermission::Read,
				PolicyPermission::Write,
				PolicyPermission::List,
			]));
		}

		#[test]
		fn wants_must_be_a_subset() {
			let policy = Policy::new(
				"p",
				"*",
				"*",
				vec![PolicyPermission::Read, PolicyPermission::List],
			)
			.unwrap();
			assert!(policy.allows(&[PolicyPermission::Read]));
			assert!(policy.allows(&[PolicyPermission::Read, PolicyPermission::List]));
			assert!(!policy.allows(&[PolicyPermission::Write]));
			assert!(!policy.allows(&[PolicyPermission::Read, PolicyPermission::Write]));
		}

		#[test]
		fn empty_wants_always_allowed_on_match() {
			let policy = Policy::new("p", "*", "*", vec![]).unwrap();
			assert!(policy.allows(&[]));
		}
	}

	mod serde_format {
		use super::*;

		#[test]
		fn permissions_serialize_lowercase() {
			assert_eq!(
				serde_json::to_string(&PolicyPermission::Super).unwrap(),
				"\"super\""
			);
			assert_eq!(
				serde_json::to_string(&PolicyPermission::Read).unwrap(),
				"\"read\""
			);
		}

		#[test]
		fn policy_fields_serialize_camel_case() {
			let policy = Policy::new("p", "*", "*", vec![PolicyPermission::Read]).unwrap();
			let json = serde_json::to_string(&policy).unwrap();
			assert!(json.contains("\"spiffeIdPattern\""));
			assert!(json.contains("\"pathPattern\""));
			assert!(json.contains("\"createdAt\""));
		}
	}
}
