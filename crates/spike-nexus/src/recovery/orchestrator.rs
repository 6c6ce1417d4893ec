// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The recovery orchestrator: lifecycle and share distribution.
//!
//! Bootstrap order on a cold start:
//!
//! 1. ask every configured keeper for its shard; with `t` or more
//!    non-empty answers, reconstruct the root key and go Healthy;
//! 2. otherwise, on a first-ever init (`bootstrap_generate`), mint a
//!    fresh root key from the CSPRNG, push shares, and go Healthy;
//! 3. otherwise wait in `AwaitingRestore` with only the restore endpoint
//!    exposed.
//!
//! The periodic push recomputes shares from the root key on every tick
//! (the split is a deterministic function of the key, so nothing about
//! the shares is ever persisted) and optimistically skips keepers that
//! fail; they converge on a later tick.

use std::sync::Arc;
use tracing::{error, info, warn};

use spike_common_crypto::shamir::{self, Share};
use spike_common_crypto::RootKey;

use crate::config::NexusConfig;
use crate::recovery::keeper_client::ShardTransport;
use crate::state::{Lifecycle, LifecycleState, RootKeyCell};

pub struct RecoveryOrchestrator {
	config: Arc<NexusConfig>,
	root_key: Arc<RootKeyCell>,
	lifecycle: Arc<Lifecycle>,
	transport: Arc<dyn ShardTransport>,
}

impl RecoveryOrchestrator {
	pub fn new(
		config: Arc<NexusConfig>,
		root_key: Arc<RootKeyCell>,
		lifecycle: Arc<Lifecycle>,
		transport: Arc<dyn ShardTransport>,
	) -> Self {
		Self {
			config,
			root_key,
			lifecycle,
			transport,
		}
	}

	/// Drive the cold-start state machine to Healthy or AwaitingRestore.
	pub async fn bootstrap(&self) -> LifecycleState {
		if let Some(root) = self.collect_from_keepers().await {
			info!("root key resumed from keeper quorum");
			self.install_root_key(root).await;
			return self.lifecycle.get();
		}

		if self.config.bootstrap_generate {
			info!("no keeper quorum; generating a fresh root key (first-ever init)");
			let root = RootKey::generate();
			self.install_root_key(root).await;
			self.redistribute().await;
			return self.lifecycle.get();
		}

		warn!("no keeper quorum and key generation disabled; awaiting operator restore");
		self.lifecycle.set(LifecycleState::AwaitingRestore);
		self.lifecycle.get()
	}

	/// Poll every configured keeper; reconstruct when `t` or more
	/// non-empty shards come back.
	async fn collect_from_keepers(&self) -> Option<RootKey> {
		let threshold = self.config.shamir_threshold;
		if self.config.keepers.is_empty() {
			return None;
		}

		let mut shares: Vec<Share> = Vec::new();
		for (&keeper_id, api_root) in &self.config.keepers {
			match self.transport.fetch_shard(api_root).await {
				Ok(Some(bytes)) => match Share::new(keeper_id, &bytes) {
					Ok(share) => shares.push(share),
					Err(e) => {
						warn!(keeper_id, error = %e, "keeper returned an unusable shard");
					}
				},
				Ok(None) => {
					info!(keeper_id, "keeper holds no shard");
				}
				Err(e) => {
					warn!(keeper_id, error = %e, "failed to fetch shard from keeper");
				}
			}
			if shares.len() >= threshold {
				break;
			}
		}

		if shares.len() < threshold {
			return None;
		}

		match shamir::reconstruct(&shares, threshold) {
			Ok(root) if !root.is_zero() => Some(root),
			Ok(_) => {
				warn!("keeper shards reconstructed the zero sentinel; ignoring");
				None
			}
			Err(e) => {
				warn!(error = %e, "keeper shard reconstruction failed");
				None
			}
		}
	}

	/// Install a root key and mark the service Healthy. The persistence
	/// adapter unlocks implicitly because it snapshots this cell per
	/// operation.
	pub async fn install_root_key(&self, root: RootKey) {
		self.root_key.install(root);
		self.lifecycle.set(LifecycleState::Healthy);
	}

	/// Operator restore completed: install the reconstructed key and
	/// immediately hand every keeper its share.
	pub async fn complete_restore(&self, root: RootKey) {
		self.install_root_key(root).await;
		self.redistribute().await;
		info!("restore complete; service is healthy");
	}

	/// One optimistic share push. Errors per keeper are logged and
	/// skipped; nothing here changes root-key state.
	pub async fn redistribute(&self) {
		if self.config.keepers.is_empty() {
			return;
		}

		let root = self.root_key.load();
		if root.is_zero() {
			warn!("root key is zero; skipping share distribution");
			return;
		}

		let n = self.config.keepers.len();
		let t = self.config.shamir_threshold;
		let shares = match shamir::split(&root, t, n) {
			Ok(shares) => shares,
			Err(e) => {
				error!(error = %e, "share computation failed; no shards distributed");
				return;
			}
		};

		for (&keeper_id, api_root) in &self.config.keepers {
			let Some(share) = shares.iter().find(|s| s.id() == keeper_id) else {
				warn!(keeper_id, "no share for keeper id; skipping");
				continue;
			};

			let bytes = share.value_bytes();
			match self.transport.send_shard(api_root, keeper_id, &bytes).await {
				Ok(()) => info!(keeper_id, "shard delivered"),
				Err(e) => warn!(keeper_id, error = %e, "shard delivery failed; will retry next tick"),
			}
			// `bytes` zeroes on drop here; `shares` zero when the loop ends.
		}
	}

	/// The periodic redistribution loop. Ticks do nothing until the
	/// service is Healthy.
	pub fn spawn_redistribution(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
		let interval = self.config.keeper_update_interval;
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			// The first tick of tokio's interval fires immediately;
			// bootstrap already pushed shares, so swallow it.
			ticker.tick().await;
			loop {
				ticker.tick().await;
				if self.lifecycle.is_healthy() {
					self.redistribute().await;
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::recovery::keeper_client::TransportError;
	use async_trait::async_trait;
	use std::collections::{BTreeMap, HashMap};
	use std::sync::Mutex;
	use std::time::Duration;
	use zeroize::Zeroizing;

	use spike_common_core::spiffe::TrustRoots;

	/// In-memory keeper fleet; `down` keepers refuse everything.
	#[derive(Default)]
	struct FakeFleet {
		held: Mutex<HashMap<String, [u8; 32]>>,
		down: Mutex<Vec<String>>,
	}

	impl FakeFleet {
		fn mark_down(&self, api_root: &str) {
			self.down.lock().unwrap().push(api_root.to_string());
		}

		fn shard_at(&self, api_root: &str) -> Option<[u8; 32]> {
			self.held.lock().unwrap().get(api_root).copied()
		}

		fn seed(&self, api_root: &str, shard: [u8; 32]) {
			self.held
				.lock()
				.unwrap()
				.insert(api_root.to_string(), shard);
		}
	}

	#[async_trait]
	impl ShardTransport for Arc<FakeFleet> {
		async fn fetch_shard(
			&self,
			api_root: &str,
		) -> Result<Option<Zeroizing<[u8; 32]>>, TransportError> {
			if self.down.lock().unwrap().iter().any(|d| d == api_root) {
				return Err(TransportError::Http("connection refused".to_string()));
			}
			Ok(self
				.held
				.lock()
				.unwrap()
				.get(api_root)
				.map(|s| Zeroizing::new(*s)))
		}

		async fn send_shard(
			&self,
			api_root: &str,
			_keeper_id: u8,
			shard: &[u8; 32],
		) -> Result<(), TransportError> {
			if self.down.lock().unwrap().iter().any(|d| d == api_root) {
				return Err(TransportError::Http("connection refused".to_string()));
			}
			self.held
				.lock()
				.unwrap()
				.insert(api_root.to_string(), *shard);
			Ok(())
		}
	}

	fn config(keeper_count: usize, threshold: usize, bootstrap_generate: bool) -> NexusConfig {
		let keepers: BTreeMap<u8, String> = (1..=keeper_count as u8)
			.map(|id| (id, format!("https://keeper-{id}:8443")))
			.collect();
		NexusConfig {
			host: "127.0.0.1".to_string(),
			port: 0,
			max_secret_versions: 10,
			shamir_threshold: threshold,
			keepers,
			database_operation_timeout: Duration::from_millis(500),
			keeper_update_interval: Duration::from_secs(300),
			bootstrap_generate,
			trust_roots: TrustRoots::single("spike.ist"),
			dev_peer_id: None,
		}
	}

	fn orchestrator(
		config: NexusConfig,
		fleet: Arc<FakeFleet>,
	) -> (RecoveryOrchestrator, Arc<RootKeyCell>, Arc<Lifecycle>) {
		let root_key = Arc::new(RootKeyCell::locked());
		let lifecycle = Arc::new(Lifecycle::new());
		let orchestrator = RecoveryOrchestrator::new(
			Arc::new(config),
			Arc::clone(&root_key),
			Arc::clone(&lifecycle),
			Arc::new(fleet),
		);
		(orchestrator, root_key, lifecycle)
	}

	#[tokio::test]
	async fn first_init_generates_and_distributes() {
		let fleet = Arc::new(FakeFleet::default());
		let (orch, root_key, lifecycle) = orchestrator(config(3, 2, true), Arc::clone(&fleet));

		let state = orch.bootstrap().await;
		assert_eq!(state, LifecycleState::Healthy);
		assert!(!root_key.is_locked());
		assert!(lifecycle.is_healthy());

		for id in 1..=3u8 {
			assert!(fleet.shard_at(&format!("https://keeper-{id}:8443")).is_some());
		}
	}

	#[tokio::test]
	async fn resumes_from_keeper_quorum() {
		let fleet = Arc::new(FakeFleet::default());
		let root = RootKey::generate();
		let shares = shamir::split(&root, 2, 3).unwrap();
		for share in &shares {
			fleet.seed(
				&format!("https://keeper-{}:8443", share.id()),
				*share.value_bytes(),
			);
		}

		// Key generation disabled: the only way to Healthy is resumption.
		let (orch, root_key, _) = orchestrator(config(3, 2, false), Arc::clone(&fleet));
		let state = orch.bootstrap().await;

		assert_eq!(state, LifecycleState::Healthy);
		assert_eq!(root_key.load().expose(), root.expose());
	}

	#[tokio::test]
	async fn resumes_even_with_one_keeper_down() {
		let fleet = Arc::new(FakeFleet::default());
		let root = RootKey::generate();
		let shares = shamir::split(&root, 2, 3).unwrap();
		for share in &shares {
			fleet.seed(
				&format!("https://keeper-{}:8443", share.id()),
				*share.value_bytes(),
			);
		}
		fleet.mark_down("https://keeper-1:8443");

		let (orch, root_key, _) = orchestrator(config(3, 2, false), Arc::clone(&fleet));
		assert_eq!(orch.bootstrap().await, LifecycleState::Healthy);
		assert_eq!(root_key.load().expose(), root.expose());
	}

	#[tokio::test]
	async fn no_quorum_and_no_generation_awaits_restore() {
		let fleet = Arc::new(FakeFleet::default());
		fleet.seed("https://keeper-1:8443", [1u8; 32]); // only one shard, t = 2

		let (orch, root_key, lifecycle) = orchestrator(config(3, 2, false), Arc::clone(&fleet));
		let state = orch.bootstrap().await;

		assert_eq!(state, LifecycleState::AwaitingRestore);
		assert!(root_key.is_locked());
		assert!(!lifecycle.is_healthy());
	}

	#[tokio::test]
	async fn redistribution_tolerates_partial_failure() {
		let fleet = Arc::new(FakeFleet::default());
		let (orch, root_key, _) = orchestrator(config(3, 2, true), Arc::clone(&fleet));
		orch.bootstrap().await;
		let root_before = *root_key.load().expose();

		// Wipe the fleet, take keeper 2 down, then push one tick.
		fleet.held.lock().unwrap().clear();
		fleet.mark_down("https://keeper-2:8443");
		orch.redistribute().await;

		assert!(fleet.shard_at("https://keeper-1:8443").is_some());
		assert!(fleet.shard_at("https://keeper-2:8443").is_none());
		assert!(fleet.shard_at("https://keeper-3:8443").is_some());

		// No root-key state change.
		assert_eq!(root_key.load().expose(), &root_before);
	}

	#[tokio::test]
	async fn redistribution_is_deterministic_across_ticks() {
		let fleet = Arc::new(FakeFleet::default());
		let (orch, _, _) = orchestrator(config(3, 2, true), Arc::clone(&fleet));
		orch.bootstrap().await;

		let first = fleet.shard_at("https://keeper-1:8443").unwrap();
		fleet.held.lock().unwrap().clear();
		orch.redistribute().await;
		let second = fleet.shard_at("https://keeper-1:8443").unwrap();

		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn redistribution_with_zero_root_key_is_a_no_op() {
		let fleet = Arc::new(FakeFleet::default());
		let (orch, _, _) = orchestrator(config(3, 2, false), Arc::clone(&fleet));
		orch.redistribute().await;
		assert!(fleet.shard_at("https://keeper-1:8443").is_none());
	}

	#[tokio::test]
	async fn complete_restore_installs_and_pushes() {
		let fleet = Arc::new(FakeFleet::default());
		let (orch, root_key, lifecycle) = orchestrator(config(3, 2, false), Arc::clone(&fleet));

		let root = RootKey::generate();
		orch.complete_restore(root.clone()).await;

		assert!(lifecycle.is_healthy());
		assert_eq!(root_key.load().expose(), root.expose());
		assert!(fleet.shard_at("https://keeper-1:8443").is_some());
	}
}
