// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The root-key custodian protocol, nexus side.
//!
//! [`RecoveryOrchestrator`] owns the lifecycle: bootstrap (resume from a
//! keeper quorum, mint a fresh key on first-ever init, or wait for an
//! operator restore) and the periodic optimistic share push. The
//! [`ShardTransport`] boundary keeps the orchestrator testable; the real
//! implementation is the mTLS [`KeeperClient`].

pub mod keeper_client;
pub mod orchestrator;

pub use keeper_client::{KeeperClient, ShardTransport, TransportError};
pub use orchestrator::RecoveryOrchestrator;
