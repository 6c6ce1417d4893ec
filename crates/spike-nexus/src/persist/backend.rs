// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The opaque key-value backend boundary.
//!
//! The real at-rest database driver lives outside this workspace; nexus
//! only assumes get/put/delete with a deadline. [`MemoryBackend`] is the
//! in-tree implementation used for development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
	#[error("backend unavailable: {0}")]
	Unavailable(String),

	#[error("backend i/o error: {0}")]
	Io(String),
}

/// Minimal contract for the encrypted at-rest store.
#[async_trait]
pub trait KeyValueBackend: Send + Sync + 'static {
	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;
	async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), BackendError>;
	async fn delete(&self, key: &str) -> Result<(), BackendError>;
}

/// In-memory backend for development and tests.
#[derive(Default)]
pub struct MemoryBackend {
	entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
		Ok(self.entries.lock().await.get(key).cloned())
	}

	async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), BackendError> {
		self.entries.lock().await.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), BackendError> {
		self.entries.lock().await.remove(key);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn memory_backend_roundtrip() {
		let backend = MemoryBackend::new();
		assert_eq!(backend.get("k").await.unwrap(), None);

		backend.put("k", vec![1, 2, 3]).await.unwrap();
		assert_eq!(backend.get("k").await.unwrap(), Some(vec![1, 2, 3]));

		backend.delete("k").await.unwrap();
		assert_eq!(backend.get("k").await.unwrap(), None);
	}
}
