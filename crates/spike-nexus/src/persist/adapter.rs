// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The persistence adapter: AEAD-seal, deadline, retry, write-behind.
//!
//! The `*_behind` methods are the fire-and-forget entry points the HTTP
//! handlers use after mutating memory. The async `load_*` methods are the
//! cache-warm reads; any failure there (locked root key, deadline,
//! backend error, decrypt failure) collapses to `None`, meaning "treat
//! as absent", because memory remains the source of truth.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use spike_common_core::policy::Policy;
use spike_common_crypto::cipher::{CipherError, RootCipher, SealedBlob};

use crate::persist::backend::{BackendError, KeyValueBackend};
use crate::persist::retry::{retry_with_backoff, Backoff};
use crate::state::secret_store::Secret;
use crate::state::RootKeyCell;

#[derive(Debug, Error)]
pub enum PersistError {
	#[error(transparent)]
	Cipher(#[from] CipherError),

	#[error(transparent)]
	Backend(#[from] BackendError),

	#[error("serialization failed: {0}")]
	Serialize(String),

	#[error("backing store deadline exceeded")]
	Timeout,
}

pub struct PersistenceAdapter {
	backend: Arc<dyn KeyValueBackend>,
	root_key: Arc<RootKeyCell>,
	operation_timeout: Duration,
	backoff: Backoff,
}

fn secret_key(path: &str) -> String {
	format!("secret:{path}")
}

fn policy_key(id: &Uuid) -> String {
	format!("policy:{id}")
}

impl PersistenceAdapter {
	pub fn new(
		backend: Arc<dyn KeyValueBackend>,
		root_key: Arc<RootKeyCell>,
		operation_timeout: Duration,
	) -> Self {
		Self {
			backend,
			root_key,
			operation_timeout,
			backoff: Backoff::default(),
		}
	}

	// -------------------------------------------------------------------------
	// Write-behind entry points
	// -------------------------------------------------------------------------

	/// Persist a secret snapshot off the request path.
	pub fn store_secret_behind(self: &Arc<Self>, path: String, secret: Secret) {
		let adapter = Arc::clone(self);
		tokio::spawn(async move {
			if let Err(error) = adapter.store_secret(&path, &secret).await {
				warn!(%path, %error, "failed to persist secret; memory remains authoritative");
			}
		});
	}

	/// Persist a policy off the request path.
	pub fn store_policy_behind(self: &Arc<Self>, policy: Policy) {
		let adapter = Arc::clone(self);
		tokio::spawn(async move {
			let id = policy.id;
			if let Err(error) = adapter.store_policy(&policy).await {
				warn!(%id, %error, "failed to persist policy; memory remains authoritative");
			}
		});
	}

	/// Remove a policy mirror off the request path.
	pub fn delete_policy_behind(self: &Arc<Self>, id: Uuid) {
		let adapter = Arc::clone(self);
		tokio::spawn(async move {
			if let Err(error) = adapter.delete_policy(&id).await {
				warn!(%id, %error, "failed to delete policy mirror");
			}
		});
	}

	// -------------------------------------------------------------------------
	// Sealed reads and writes
	// -------------------------------------------------------------------------

	pub async fn store_secret(&self, path: &str, secret: &Secret) -> Result<(), PersistError> {
		let payload =
			serde_json::to_vec(secret).map_err(|e| PersistError::Serialize(e.to_string()))?;
		self.put_sealed(&secret_key(path), &payload).await
	}

	/// Cache-warm read of one secret. Any failure is "absent".
	pub async fn load_secret(&self, path: &str) -> Option<Secret> {
		let payload = self.get_sealed(&secret_key(path)).await?;
		match serde_json::from_slice(&payload) {
			Ok(secret) => Some(secret),
			Err(error) => {
				warn!(%path, %error, "stored secret record is unreadable; treating as absent");
				None
			}
		}
	}

	pub async fn store_policy(&self, policy: &Policy) -> Result<(), PersistError> {
		let payload =
			serde_json::to_vec(policy).map_err(|e| PersistError::Serialize(e.to_string()))?;
		self.put_sealed(&policy_key(&policy.id), &payload).await
	}

	/// Cache-warm read of one policy, with its patterns recompiled.
	pub async fn load_policy(&self, id: &Uuid) -> Option<Policy> {
		let payload = self.get_sealed(&policy_key(id)).await?;
		let mut policy: Policy = match serde_json::from_slice(&payload) {
			Ok(policy) => policy,
			Err(error) => {
				warn!(%id, %error, "stored policy record is unreadable; treating as absent");
				return None;
			}
		};
		if let Err(error) = policy.recompile() {
			warn!(%id, %error, "stored policy no longer compiles; treating as absent");
			return None;
		}
		Some(policy)
	}

	pub async fn delete_policy(&self, id: &Uuid) -> Result<(), PersistError> {
		let key = policy_key(id);
		let backend = Arc::clone(&self.backend);
		let timeout = self.operation_timeout;
		retry_with_backoff("delete-policy", &self.backoff, || {
			let backend = Arc::clone(&backend);
			let key = key.clone();
			async move {
				tokio::time::timeout(timeout, backend.delete(&key))
					.await
					.map_err(|_| PersistError::Timeout)?
					.map_err(PersistError::from)
			}
		})
		.await
	}

	/// Seal and write one value with deadline and retry. Fails closed on
	/// the zero root key.
	async fn put_sealed(&self, key: &str, payload: &[u8]) -> Result<(), PersistError> {
		let cipher = RootCipher::new(&self.root_key.load())?;
		let sealed = cipher.seal(payload)?.to_bytes();

		let backend = Arc::clone(&self.backend);
		let timeout = self.operation_timeout;
		let key = key.to_string();
		retry_with_backoff("put", &self.backoff, || {
			let backend = Arc::clone(&backend);
			let key = key.clone();
			let sealed = sealed.clone();
			async move {
				tokio::time::timeout(timeout, backend.put(&key, sealed))
					.await
					.map_err(|_| PersistError::Timeout)?
					.map_err(PersistError::from)
			}
		})
		.await
	}

	/// Read and open one value. Every failure mode collapses to `None`.
	async fn get_sealed(&self, key: &str) -> Option<Vec<u8>> {
		let cipher = match RootCipher::new(&self.root_key.load()) {
			Ok(cipher) => cipher,
			Err(CipherError::LockedRootKey) => {
				warn!(key, "root key is locked; backing store read refused");
				return None;
			}
			Err(error) => {
				warn!(key, %error, "cipher construction failed");
				return None;
			}
		};

		let backend = Arc::clone(&self.backend);
		let timeout = self.operation_timeout;
		let owned_key = key.to_string();
		let fetched = retry_with_backoff("get", &self.backoff, || {
			let backend = Arc::clone(&backend);
			let key = owned_key.clone();
			async move {
				tokio::time::timeout(timeout, backend.get(&key))
					.await
					.map_err(|_| PersistError::Timeout)?
					.map_err(PersistError::from)
			}
		})
		.await;

		let bytes = match fetched {
			Ok(Some(bytes)) => bytes,
			Ok(None) => return None,
			Err(error) => {
				warn!(key, %error, "backing store read failed after retries; treating as absent");
				return None;
			}
		};

		let blob = match SealedBlob::from_bytes(&bytes) {
			Ok(blob) => blob,
			Err(error) => {
				warn!(key, %error, "stored blob is malformed; treating as absent");
				return None;
			}
		};

		match cipher.open(&blob) {
			Ok(plaintext) => Some(plaintext.to_vec()),
			Err(error) => {
				warn!(key, %error, "stored blob failed authentication; treating as absent");
				None
			}
		}
	}
}
