// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SPIKE Nexus: the central secrets service.
//!
//! Nexus owns the root key, the versioned secret store, and the policy
//! engine, and drives the keeper custodian protocol:
//!
//! - on boot it tries to resume the root key from a keeper quorum,
//!   generates a fresh one on first-ever init, or waits for an operator
//!   restore;
//! - while healthy it periodically recomputes the deterministic share
//!   split and pushes each keeper its share;
//! - `recover`/`restore` are the operator-driven flows that bootstrap a
//!   replacement instance from two pilot shards.
//!
//! The mutual-TLS plane is external: the transport wrapper injects the
//! validated peer SPIFFE identity as a request extension, and everything
//! here treats that as the sole source of caller identity.

pub mod audit;
pub mod config;
pub mod http;
pub mod persist;
pub mod recovery;
pub mod state;

use std::sync::Arc;

use crate::audit::AuditTrail;
use crate::config::NexusConfig;
use crate::persist::{KeyValueBackend, PersistenceAdapter};
use crate::recovery::{RecoveryOrchestrator, ShardTransport};
use crate::state::{Lifecycle, PolicyEngine, RestoreSession, RootKeyCell, SecretStore};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
	pub config: Arc<NexusConfig>,
	pub secrets: Arc<SecretStore>,
	pub policies: Arc<PolicyEngine>,
	pub restore: Arc<RestoreSession>,
	pub root_key: Arc<RootKeyCell>,
	pub lifecycle: Arc<Lifecycle>,
	pub persist: Arc<PersistenceAdapter>,
	pub audit: Arc<AuditTrail>,
	pub orchestrator: Arc<RecoveryOrchestrator>,
}

/// Wire the state graph together from a config, a backing store, and a
/// shard transport.
pub fn create_app_state(
	config: NexusConfig,
	backend: Arc<dyn KeyValueBackend>,
	transport: Arc<dyn ShardTransport>,
) -> AppState {
	let config = Arc::new(config);
	let root_key = Arc::new(RootKeyCell::locked());
	let lifecycle = Arc::new(Lifecycle::new());
	let restore = Arc::new(RestoreSession::new(config.shamir_threshold));
	let persist = Arc::new(PersistenceAdapter::new(
		backend,
		Arc::clone(&root_key),
		config.database_operation_timeout,
	));
	let orchestrator = Arc::new(RecoveryOrchestrator::new(
		Arc::clone(&config),
		Arc::clone(&root_key),
		Arc::clone(&lifecycle),
		transport,
	));

	AppState {
		secrets: Arc::new(SecretStore::new(config.max_secret_versions)),
		policies: Arc::new(PolicyEngine::new()),
		restore,
		root_key,
		lifecycle,
		persist,
		audit: Arc::new(AuditTrail::new(1024)),
		orchestrator,
		config,
	}
}

pub use http::router::create_router;
