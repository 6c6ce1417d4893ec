// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Global mutable state, each piece behind a single owning service object.
//!
//! - [`RootKeyCell`]: the current root key, snapshot-on-read
//! - [`Lifecycle`]: the process-wide recovery state machine position
//! - [`SecretStore`]: the versioned secret map
//! - [`PolicyEngine`]: the policy map and access checks
//! - [`RestoreSession`]: the operator restore shard set

pub mod policy_engine;
pub mod restore_session;
pub mod secret_store;

pub use policy_engine::PolicyEngine;
pub use restore_session::{RestoreOutcome, RestoreSession};
pub use secret_store::{Secret, SecretStore, SecretVersion};

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::RwLock;

use spike_common_crypto::RootKey;

/// The current root key behind a snapshot-swap cell.
///
/// Readers clone a 32-byte snapshot under a short read lock; installing a
/// replacement swaps the cell and the previous value zeroes itself when
/// the last snapshot drops.
pub struct RootKeyCell {
	inner: RwLock<RootKey>,
}

impl RootKeyCell {
	/// Start locked (the zero sentinel).
	pub fn locked() -> Self {
		Self {
			inner: RwLock::new(RootKey::zero()),
		}
	}

	/// Snapshot the current key.
	pub fn load(&self) -> RootKey {
		self.inner.read().expect("root key lock poisoned").clone()
	}

	/// Install a replacement key.
	pub fn install(&self, key: RootKey) {
		*self.inner.write().expect("root key lock poisoned") = key;
	}

	/// Whether the cell still holds the zero sentinel.
	pub fn is_locked(&self) -> bool {
		self.inner.read().expect("root key lock poisoned").is_zero()
	}
}

/// Position in the recovery state machine.
///
/// ```text
/// Bootstrapping ──root-key-generated──▶ Healthy
/// Bootstrapping ──resumed-from-keepers─▶ Healthy
/// Bootstrapping ──no-quorum────────────▶ AwaitingRestore
/// AwaitingRestore ──t shards restored──▶ Healthy
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
	Bootstrapping = 0,
	Healthy = 1,
	AwaitingRestore = 2,
}

/// Atomic holder for the lifecycle state.
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
	pub fn new() -> Self {
		Self(AtomicU8::new(LifecycleState::Bootstrapping as u8))
	}

	pub fn get(&self) -> LifecycleState {
		match self.0.load(Ordering::SeqCst) {
			0 => LifecycleState::Bootstrapping,
			1 => LifecycleState::Healthy,
			_ => LifecycleState::AwaitingRestore,
		}
	}

	pub fn set(&self, state: LifecycleState) {
		self.0.store(state as u8, Ordering::SeqCst);
	}

	pub fn is_healthy(&self) -> bool {
		self.get() == LifecycleState::Healthy
	}
}

impl Default for Lifecycle {
	fn default() -> Self {
		Self::new()
	}
}
