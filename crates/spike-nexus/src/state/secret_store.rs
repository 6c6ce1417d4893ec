// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The versioned in-memory secret store.
//!
//! `path → ordered versions`, soft delete via `deleted_at`, history
//! bounded by `max_versions` with oldest-first eviction. Version numbers
//! are strictly monotonic per path and survive eviction: the counter only
//! moves forward. Version `0` in API calls means "current", i.e. the
//! highest non-deleted version.
//!
//! The whole map sits behind one reader-writer lock. Memory is the source
//! of truth; persistence is write-behind and handled by the caller with
//! the snapshots these methods return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use spike_common_core::reqres::SecretVersionInfo;
use spike_common_core::ApiError;

/// One stored version of a secret.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretVersion {
	pub version: u64,
	pub data: HashMap<String, String>,
	pub created_at: DateTime<Utc>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for SecretVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretVersion")
			.field("version", &self.version)
			.field("data", &"[REDACTED]")
			.field("created_at", &self.created_at)
			.field("deleted_at", &self.deleted_at)
			.finish()
	}
}

/// The full version history of one path.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
	pub versions: BTreeMap<u64, SecretVersion>,
	/// The next version number to assign; never reset, so version
	/// numbers stay strictly monotonic even after eviction.
	pub next_version: u64,
}

impl Secret {
	/// The highest non-deleted version, if any.
	pub fn current(&self) -> Option<&SecretVersion> {
		self.versions
			.values()
			.rev()
			.find(|v| v.deleted_at.is_none())
	}
}

impl std::fmt::Debug for Secret {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Secret")
			.field("versions", &self.versions.len())
			.field("next_version", &self.next_version)
			.finish()
	}
}

/// The versioned map, guarded by a single reader-writer lock.
pub struct SecretStore {
	max_versions: usize,
	entries: RwLock<HashMap<String, Secret>>,
}

impl SecretStore {
	pub fn new(max_versions: usize) -> Self {
		Self {
			max_versions: max_versions.max(1),
			entries: RwLock::new(HashMap::new()),
		}
	}

	/// Append a new version at `path`, evicting the oldest beyond the
	/// history cap. Returns a snapshot of the whole secret for the
	/// write-behind path.
	pub fn put(&self, path: &str, data: HashMap<String, String>) -> Secret {
		let mut entries = self.entries.write().expect("secret store lock poisoned");
		let secret = entries.entry(path.to_string()).or_default();

		if secret.next_version == 0 {
			secret.next_version = 1;
		}
		let version = secret.next_version;
		secret.next_version += 1;

		secret.versions.insert(
			version,
			SecretVersion {
				version,
				data,
				created_at: Utc::now(),
				deleted_at: None,
			},
		);

		while secret.versions.len() > self.max_versions {
			let oldest = *secret.versions.keys().next().expect("nonempty map");
			secret.versions.remove(&oldest);
		}

		secret.clone()
	}

	/// Read one version. `0` resolves to the current version. Absent or
	/// soft-deleted versions are `NotFound`.
	pub fn get(&self, path: &str, version: u64) -> Result<SecretVersion, ApiError> {
		let entries = self.entries.read().expect("secret store lock poisoned");
		let secret = entries.get(path).ok_or(ApiError::NotFound)?;

		if version == 0 {
			return secret.current().cloned().ok_or(ApiError::NotFound);
		}

		match secret.versions.get(&version) {
			Some(v) if v.deleted_at.is_none() => Ok(v.clone()),
			_ => Err(ApiError::NotFound),
		}
	}

	/// Soft-delete the listed versions (`0` means current). Versions not
	/// present are skipped. Returns a snapshot for the write-behind path.
	pub fn delete(&self, path: &str, versions: &[u64]) -> Result<Secret, ApiError> {
		self.mark(path, versions, Some(Utc::now()))
	}

	/// Clear `deleted_at` on the listed versions if they still exist in
	/// the history window.
	pub fn undelete(&self, path: &str, versions: &[u64]) -> Result<Secret, ApiError> {
		self.mark(path, versions, None)
	}

	fn mark(
		&self,
		path: &str,
		versions: &[u64],
		deleted_at: Option<DateTime<Utc>>,
	) -> Result<Secret, ApiError> {
		let mut entries = self.entries.write().expect("secret store lock poisoned");
		let secret = entries.get_mut(path).ok_or(ApiError::NotFound)?;

		for &requested in versions {
			let target = if requested == 0 {
				match deleted_at {
					// Deleting "current" targets the highest non-deleted
					// version; undeleting "current" targets the highest
					// version outright.
					Some(_) => secret.current().map(|v| v.version),
					None => secret.versions.keys().next_back().copied(),
				}
			} else {
				Some(requested)
			};

			if let Some(version) = target {
				if let Some(entry) = secret.versions.get_mut(&version) {
					entry.deleted_at = deleted_at;
				}
			}
		}

		Ok(secret.clone())
	}

	/// All known paths, sorted. Includes paths whose current version is
	/// soft-deleted; absence from this list means never-created.
	pub fn list_paths(&self) -> Vec<String> {
		let entries = self.entries.read().expect("secret store lock poisoned");
		let mut paths: Vec<String> = entries.keys().cloned().collect();
		paths.sort();
		paths
	}

	/// The version list with timestamps but no data.
	pub fn metadata(&self, path: &str) -> Result<Vec<SecretVersionInfo>, ApiError> {
		let entries = self.entries.read().expect("secret store lock poisoned");
		let secret = entries.get(path).ok_or(ApiError::NotFound)?;
		Ok(secret
			.versions
			.values()
			.map(|v| SecretVersionInfo {
				version: v.version,
				created_at: v.created_at,
				deleted_at: v.deleted_at,
			})
			.collect())
	}

	/// Warm the cache with a record loaded from the backing store. An
	/// existing in-memory entry wins; memory is the source of truth.
	pub fn insert_loaded(&self, path: &str, secret: Secret) {
		let mut entries = self.entries.write().expect("secret store lock poisoned");
		entries.entry(path.to_string()).or_insert(secret);
	}
}
