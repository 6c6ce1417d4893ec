// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SPIKE Keeper: a peer that holds exactly one 32-byte shard in memory.
//!
//! Keepers are deliberately tiny. They accept a shard from the nexus
//! (`contribute`, overwriting any previous one), serve it back on
//! authenticated request (`read`), and nothing else. A keeper whose
//! shard is all-zero holds nothing and answers 404. Shard state never
//! touches disk; a keeper restart simply waits for the next
//! redistribution tick.

pub mod config;
pub mod routes;
pub mod state;

use std::sync::Arc;

use crate::config::KeeperConfig;
use crate::state::ShardCell;

/// Shared keeper state, cloned into the handlers.
#[derive(Clone)]
pub struct AppState {
	pub config: Arc<KeeperConfig>,
	pub shard: Arc<ShardCell>,
}

pub fn create_app_state(config: KeeperConfig) -> AppState {
	AppState {
		config: Arc::new(config),
		shard: Arc::new(ShardCell::new()),
	}
}

pub use routes::create_router;
