// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The operator restore session.
//!
//! A process-wide set of contributed shards, keyed by shard id so a
//! duplicate contribution replaces rather than double-counts. Reaching
//! the threshold triggers reconstruction inside the same lock: either the
//! root key comes back ([`RestoreOutcome::Restored`]) or the set is
//! cleared and the orchestrator stays in `AwaitingRestore`
//! ([`RestoreOutcome::Failed`]).

use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::warn;
use zeroize::Zeroizing;

use spike_common_crypto::shamir::{self, Share};
use spike_common_crypto::RootKey;

/// Result of one shard contribution.
#[derive(Debug)]
pub enum RestoreOutcome {
	/// More shards are needed.
	Pending { collected: usize, remaining: usize },
	/// Quorum reached and reconstruction succeeded; the session is drained.
	Restored(RootKey),
	/// Quorum reached but reconstruction failed (for instance, shards
	/// from unrelated runs). The session is cleared.
	Failed,
}

pub struct RestoreSession {
	threshold: usize,
	shards: Mutex<BTreeMap<u8, Zeroizing<[u8; 32]>>>,
}

impl RestoreSession {
	pub fn new(threshold: usize) -> Self {
		Self {
			threshold: threshold.max(1),
			shards: Mutex::new(BTreeMap::new()),
		}
	}

	pub fn threshold(&self) -> usize {
		self.threshold
	}

	pub fn collected(&self) -> usize {
		self.shards.lock().expect("restore lock poisoned").len()
	}

	/// Add one shard. The append, the quorum check, and the
	/// reconstruction attempt happen atomically under the session lock.
	pub fn contribute(&self, id: u8, shard: &[u8; 32]) -> RestoreOutcome {
		let mut shards = self.shards.lock().expect("restore lock poisoned");
		shards.insert(id, Zeroizing::new(*shard));

		if shards.len() < self.threshold {
			return RestoreOutcome::Pending {
				collected: shards.len(),
				remaining: self.threshold - shards.len(),
			};
		}

		let mut parsed: Vec<Share> = Vec::with_capacity(shards.len());
		for (&shard_id, bytes) in shards.iter() {
			match Share::new(shard_id, bytes) {
				Ok(share) => parsed.push(share),
				Err(e) => {
					warn!(error = %e, shard_id, "restore shard is not a valid share; clearing session");
					shards.clear();
					return RestoreOutcome::Failed;
				}
			}
		}

		match shamir::reconstruct(&parsed, self.threshold) {
			Ok(root) if !root.is_zero() => {
				shards.clear();
				RestoreOutcome::Restored(root)
			}
			Ok(_) => {
				warn!("restore reconstructed the zero sentinel; clearing session");
				shards.clear();
				RestoreOutcome::Failed
			}
			Err(e) => {
				warn!(error = %e, "restore reconstruction failed; clearing session");
				shards.clear();
				RestoreOutcome::Failed
			}
		}
	}
}
