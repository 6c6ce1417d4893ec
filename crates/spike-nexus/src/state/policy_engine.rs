// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The policy engine: storage plus the `check` decision.
//!
//! Policies live authoritatively in memory; the backing store is a
//! best-effort mirror that the HTTP layer consults on a `get` miss.
//! `create` runs its duplicate-name scan inside the map's single write
//! guard, which closes the create/create race without a second lock.
//!
//! `check` is a pure function of the policy set: the pilot role short-
//! circuits to allow, then policies are scanned in unspecified order and
//! the first one whose (anchored) patterns cover the caller and path and
//! whose permission set satisfies the request grants access.

use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use spike_common_core::policy::{Policy, PolicyError, PolicyPermission};
use spike_common_core::spiffe::{SpiffeId, TrustRoots};

pub struct PolicyEngine {
	policies: RwLock<HashMap<Uuid, Policy>>,
}

impl PolicyEngine {
	pub fn new() -> Self {
		Self {
			policies: RwLock::new(HashMap::new()),
		}
	}

	/// Create a policy: unique name, eagerly compiled patterns, fresh id
	/// and creation timestamp.
	pub fn create(
		&self,
		name: &str,
		spiffe_id_pattern: &str,
		path_pattern: &str,
		permissions: Vec<PolicyPermission>,
	) -> Result<Policy, PolicyError> {
		let mut policies = self.policies.write().expect("policy lock poisoned");

		if policies.values().any(|p| p.name == name) {
			return Err(PolicyError::AlreadyExists);
		}

		let policy = Policy::new(name, spiffe_id_pattern, path_pattern, permissions)?;
		policies.insert(policy.id, policy.clone());
		Ok(policy)
	}

	pub fn get(&self, id: &Uuid) -> Option<Policy> {
		self.policies
			.read()
			.expect("policy lock poisoned")
			.get(id)
			.cloned()
	}

	/// Warm the cache with a policy loaded from the backing store.
	pub fn insert(&self, policy: Policy) {
		self.policies
			.write()
			.expect("policy lock poisoned")
			.entry(policy.id)
			.or_insert(policy);
	}

	pub fn delete(&self, id: &Uuid) -> Result<(), PolicyError> {
		let mut policies = self.policies.write().expect("policy lock poisoned");
		policies.remove(id).map(|_| ()).ok_or(PolicyError::NotFound)
	}

	pub fn list(&self) -> Vec<Policy> {
		self.policies
			.read()
			.expect("policy lock poisoned")
			.values()
			.cloned()
			.collect()
	}

	/// Policies whose path pattern string equals `path_pattern` exactly.
	pub fn list_by_path(&self, path_pattern: &str) -> Vec<Policy> {
		self.policies
			.read()
			.expect("policy lock poisoned")
			.values()
			.filter(|p| p.path_pattern == path_pattern)
			.cloned()
			.collect()
	}

	/// Policies whose identity pattern string equals `spiffe_id_pattern`
	/// exactly.
	pub fn list_by_spiffe_id(&self, spiffe_id_pattern: &str) -> Vec<Policy> {
		self.policies
			.read()
			.expect("policy lock poisoned")
			.values()
			.filter(|p| p.spiffe_id_pattern == spiffe_id_pattern)
			.cloned()
			.collect()
	}

	/// The access decision. True iff the caller is a pilot, or some
	/// policy matches `(id, path)` and its permission set covers `wants`
	/// (where `Super` covers everything).
	pub fn check(
		&self,
		trust_roots: &TrustRoots,
		id: &SpiffeId,
		path: &str,
		wants: &[PolicyPermission],
	) -> bool {
		if trust_roots.is_pilot(id) {
			return true;
		}

		let policies = self.policies.read().expect("policy lock poisoned");
		for policy in policies.values() {
			if !policy.matches_spiffe_id(id) || !policy.matches_path(path) {
				continue;
			}
			if policy.allows(wants) {
				return true;
			}
		}
		false
	}
}

impl Default for PolicyEngine {
	fn default() -> Self {
		Self::new()
	}
}
